use std::env;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

fn main() {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo");
    let dest_path = Path::new(&out_dir).join("songs.rs");
    let sheets_dir = Path::new(&manifest_dir).join("sheets");

    let mut entries: Vec<_> = WalkDir::new(&sheets_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "song"))
        .collect();
    entries.sort_by(|a, b| a.path().cmp(b.path()));

    let mut code = String::new();
    code.push_str("/// Embedded song files as (name, content)\n");
    code.push_str("pub static SONGS: &[(&str, &str)] = &[\n");
    for entry in entries {
        let path = entry.path();
        let name = path
            .strip_prefix(&sheets_dir)
            .unwrap_or(path)
            .with_extension("")
            .to_string_lossy()
            .replace('\\', "/");
        code.push_str(&format!(
            "    ({:?}, include_str!({:?})),\n",
            name,
            path.display().to_string()
        ));
    }
    code.push_str("];\n");

    fs::write(&dest_path, code).expect("failed to write songs.rs");

    println!("cargo:rerun-if-changed=sheets");
}
