//! Send one http-stream call to a function socket, the way the platform
//! would, and print what comes back.

use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use http_body_util::{BodyExt, Full};
use hyper::Request;
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;
use uuid::Uuid;

use fdk::protocol::encode_gateway_header;
use fdk::protocol::names::{CALL_ID, DEADLINE, METHOD, REQUEST_URL};

#[derive(Parser)]
#[command(name = "fdk-call")]
#[command(about = "Invoke a function over its http-stream socket", long_about = None)]
struct Cli {
    /// Socket path (the part after `unix:` in FN_LISTENER)
    #[arg(short, long)]
    socket: String,

    /// Gateway method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Gateway URL
    #[arg(short, long, default_value = "/")]
    url: String,

    /// Gateway header, `name:value`; repeatable
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Request body
    #[arg(short, long, default_value = "")]
    data: String,

    /// Seconds until the call deadline
    #[arg(long, default_value_t = 30)]
    timeout: i64,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected name:value, got {raw:?}"))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let stream = UnixStream::connect(&cli.socket).await?;
    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            eprintln!("connection error: {err}");
        }
    });

    let deadline = Utc::now() + chrono::Duration::seconds(cli.timeout);
    let mut request = Request::post("/call")
        .header("Host", "localhost")
        .header(CALL_ID, Uuid::new_v4().to_string())
        .header(DEADLINE, deadline.to_rfc3339_opts(SecondsFormat::Millis, true))
        .header(METHOD, cli.method.to_ascii_uppercase())
        .header(REQUEST_URL, &cli.url);
    for (name, value) in &cli.headers {
        request = request.header(encode_gateway_header(name), value);
    }
    let request = request.body(Full::new(Bytes::from(cli.data)))?;

    let response = sender.send_request(request).await?;
    println!("{:?} {}", response.version(), response.status());
    for (name, value) in response.headers() {
        println!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
    }
    println!();

    let body = response.into_body().collect().await?.to_bytes();
    println!("{}", String::from_utf8_lossy(&body));
    Ok(())
}
