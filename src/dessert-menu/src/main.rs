fn main() -> anyhow::Result<()> {
    dessert_cli::main()
}
