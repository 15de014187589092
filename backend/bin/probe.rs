use anyhow::{Context, Result};
use clap::{Arg, Command};
use companion::models::UserProfile;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    companion::utils::init_logging();

    let matches = Command::new("probe")
        .about("Board the train from a terminal: submit a profile, then chat over stdin")
        .arg(
            Arg::new("server")
                .long("server")
                .short('s')
                .help("Base URL of the companion server")
                .default_value("http://127.0.0.1:8080"),
        )
        .arg(
            Arg::new("id")
                .long("id")
                .help("User id to travel as, random when omitted"),
        )
        .arg(
            Arg::new("likes")
                .long("likes")
                .short('l')
                .help("Comma separated likes")
                .default_value(""),
        )
        .arg(
            Arg::new("dislikes")
                .long("dislikes")
                .short('d')
                .help("Comma separated dislikes")
                .default_value(""),
        )
        .arg(
            Arg::new("hi")
                .long("hi")
                .help("Opening remark for a proposed companion")
                .default_value(""),
        )
        .get_matches();

    let server = matches
        .get_one::<String>("server")
        .map(|s| s.trim_end_matches('/').to_string())
        .unwrap_or_default();
    let id = matches
        .get_one::<String>("id")
        .cloned()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let profile = UserProfile {
        id: id.clone(),
        likes: split_list(matches.get_one::<String>("likes")),
        dislikes: split_list(matches.get_one::<String>("dislikes")),
        hi: matches.get_one::<String>("hi").cloned().unwrap_or_default(),
    };

    let client = reqwest::Client::new();
    client
        .post(format!("{}/user", server))
        .json(&profile)
        .send()
        .await
        .context("submitting profile")?
        .error_for_status()
        .context("profile rejected")?;
    info!("Profile submitted as {}", id);

    let catalog: Vec<String> = client
        .get(format!("{}/likes", server))
        .send()
        .await
        .context("fetching catalog")?
        .json()
        .await?;
    info!("Known interests: {}", catalog.join(", "));

    let ws_url = format!("{}/start?userId={}", server.replacen("http", "ws", 1), id);
    let (socket, _) = connect_async(ws_url.as_str())
        .await
        .with_context(|| format!("connecting to {}", ws_url))?;
    let (mut sink, mut stream) = socket.split();

    let printer = tokio::spawn(async move {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => println!("< {}", text.as_str()),
                Ok(Message::Close(frame)) => {
                    info!("Server closed the connection: {:?}", frame);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Connection error: {}", e);
                    break;
                }
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if printer.is_finished() {
            break;
        }
        if line.is_empty() {
            continue;
        }
        sink.send(Message::text(line)).await?;
    }

    let _ = sink.send(Message::Close(None)).await;
    printer.abort();
    Ok(())
}

fn split_list(raw: Option<&String>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}
