use anyhow::Result;
use vergen::EmitBuilder;

// Exposes VERGEN_GIT_SHA / VERGEN_GIT_DESCRIBE for the CLI version string.
fn main() -> Result<()> {
    EmitBuilder::builder()
        .git_sha(true)
        .git_describe(true, true, None)
        .emit()?;
    Ok(())
}
