fn main() -> anyhow::Result<()> {
    mhwimm::run()?;
    Ok(())
}
