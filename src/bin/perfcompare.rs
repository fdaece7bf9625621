use anyhow::Result;

fn main() -> Result<()> {
    perfcompare::cli::run()
}
