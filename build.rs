use std::fs;

fn main() {
    // The exception table is embedded with `include_str!`; reject a malformed
    // table at build time instead of at first lookup.
    println!("cargo:rerun-if-changed=src/exception_codes.toml");
    let src = match fs::read_to_string("src/exception_codes.toml") {
        Ok(s) => s,
        Err(e) => panic!("cannot read src/exception_codes.toml: {e}"),
    };
    if let Err(e) = toml::from_str::<toml::Table>(&src) {
        panic!("src/exception_codes.toml is not valid TOML: {e}");
    }
}
