use std::env;
use std::error::Error;

use broker_core::ModifyTask;
use broker_protocol::{decode_frame, encode_frame, Frame};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Where to connect and which session to claim: env overrides or defaults.
    let url = env::var("BROKER_CLIENT_URL").unwrap_or_else(|_| "ws://127.0.0.1:8123/socket".to_string());
    let code = env::var("BROKER_CLIENT_CODE").unwrap_or_else(|_| "ABCD1234".to_string());

    println!("Connecting to {}...", url);
    let (ws, _) = connect_async(url.as_str()).await?;
    let (mut sink, mut stream) = ws.split();
    println!("Connected. Claiming session {}.", code);

    // Bind the code first, then announce the bot so dispatch starts.
    let hello = [
        Frame::new("connectCode", json!(code)),
        Frame::new("botID", json!(1)),
    ];
    for frame in &hello {
        sink.send(Message::text(encode_frame(frame)?)).await?;
    }

    println!("Waiting for modify tasks (ctrl-c to quit)...\n");

    loop {
        let msg = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\nInterrupted, exiting client.");
                break;
            }
            msg = stream.next() => msg,
        };

        let text = match msg {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => {
                println!("Server closed the connection.");
                break;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                eprintln!("Read error: {}", e);
                break;
            }
        };

        let frame = match decode_frame(text.as_str()) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Could not decode frame: {}", e);
                continue;
            }
        };
        if frame.event != "modify" {
            println!("<< {} {}", frame.event, frame.data);
            continue;
        }

        let task: ModifyTask = match serde_json::from_value(frame.data) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("Bad modify payload: {}", e);
                continue;
            }
        };
        println!(
            "<< modify task={} guild={} user={} deaf={} mute={}",
            task.task_id, task.guild_id, task.user_id, task.parameters.deaf, task.parameters.mute
        );

        // Pretend the mute/deafen went through.
        let reply = Frame::new("taskComplete", json!(task.task_id));
        sink.send(Message::text(encode_frame(&reply)?)).await?;
        println!(">> taskComplete {}", task.task_id);
    }

    let _ = sink.close().await;
    Ok(())
}
