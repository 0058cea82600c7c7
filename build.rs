use std::io::Write;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // For each .bin report descriptor in tests/data, create one test function
    // that runs the rewriter and locator over it
    let datadir: PathBuf = [concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data")]
        .iter()
        .collect();
    println!("cargo:rerun-if-changed={}", datadir.display());

    let out_dir = std::env::var_os("OUT_DIR").ok_or("OUT_DIR not set")?;
    let dest_path = PathBuf::from(&out_dir).join("test-report-descriptors.rs");
    let mut file = std::fs::File::create(dest_path)?;

    writeln!(file, "use padscreen::locator::{{locate_input_mode, LocateError}};")?;
    writeln!(file, "use padscreen::rewriter::*;")?;
    writeln!(file)?;

    let mut fixtures: Vec<PathBuf> = std::fs::read_dir(&datadir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "bin"))
        .collect();
    fixtures.sort();

    for path in fixtures {
        let Some(filename) = path.file_name().and_then(|f| f.to_str()) else {
            continue;
        };
        let funcname = filename.replace([':', '.', '-'], "_");
        writeln!(
            file,
            "
#[test]
#[allow(non_snake_case)]
fn test_{funcname}() {{
    let original: Vec<u8> = std::fs::read({path:?}).unwrap();
    let mut bytes = original.clone();
    match find_touchpad_usages(&original) {{
        Ok(offsets) => {{
            let count = rewrite_touchpad_usages(&mut bytes)
                .unwrap_or_else(|e| panic!(\"Failed to rewrite {filename}: {{e}}\"));
            assert_eq!(count, offsets.len());
            assert_eq!(bytes.len(), original.len());
            let changed: Vec<usize> = (0..bytes.len()).filter(|&i| bytes[i] != original[i]).collect();
            assert_eq!(changed, offsets);
            let once = bytes.clone();
            assert!(!patch_report_descriptor(&mut bytes));
            assert_eq!(bytes, once);
            let located = locate_input_mode(&bytes);
            assert!(
                !matches!(located, Err(LocateError::Decode(_))),
                \"Failed to scan {filename}: {{located:?}}\"
            );
        }}
        Err(_) => {{
            assert!(!patch_report_descriptor(&mut bytes));
            assert_eq!(bytes, original);
            assert_ne!(locate_input_mode(&bytes), Err(LocateError::NotFound));
        }}
    }}
}}
"
        )?;
    }

    Ok(())
}
