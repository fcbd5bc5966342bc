mod replay;
mod runtime;

fn main() -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .with_colors(true)
        .with_threads(true)
        .with_local_timestamps()
        .init()?;

    let tokio_runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    tokio_runtime.block_on(async {
        let config = painel_feed::config::load_config().await?;
        runtime::run(config).await
    })
}
