use clap::{Arg, Command, value_parser};
use companion::{AppState, Config, Hub, create_router, utils};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_logging();

    let matches = Command::new("server")
        .about("Pairs anonymous travellers into timed companion chats")
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .help("Port to listen on, overrides PORT")
                .value_parser(value_parser!(u16)),
        )
        .get_matches();

    let mut config = Config::from_env()?;
    if let Some(port) = matches.get_one::<u16>("port") {
        config.port = *port;
    }

    let hub = Hub::spawn(config.hub_settings());
    let port = config.port;
    let app = create_router(AppState::new(hub, config));

    let listener = tokio::net::TcpListener::bind(&format!("0.0.0.0:{}", port)).await?;
    tracing::info!("Server running on port {}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
