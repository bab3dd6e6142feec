fn main() -> anyhow::Result<()> {
    routeweave::cli::run_cli()
}
