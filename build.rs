// build.rs

fn main() {
    // Generate build info
    if let Err(e) = vergen::EmitBuilder::builder().all_build().emit() {
        println!("cargo:warning=Unable to generate build info: {e}");
    }
}
