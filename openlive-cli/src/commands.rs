//! Command execution.

use crate::Commands;
use colored::Colorize;
use openlive_api::ApiClient;
use openlive_protocol::{Decoded, Decoder, FrameHeader};

/// Executes a control-plane command and returns the formatted output.
pub async fn execute(
    client: &ApiClient,
    cmd: Commands,
) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        Commands::Start { app_id, code } => {
            let result = client.app_start(app_id, &code).await?;

            let mut output = format!(
                "{} app session {}\n  Auth body: {}\n  Links:",
                "Started".green(),
                result.game_info.game_id.cyan(),
                result.websocket_info.auth_body
            );
            for link in &result.websocket_info.wss_link {
                output.push_str(&format!("\n    {}", link));
            }
            if let Some(anchor) = &result.anchor_info {
                output.push_str(&format!(
                    "\n  Room: {} ({})",
                    anchor.room_id,
                    anchor.uname.yellow()
                ));
            }
            Ok(output)
        }

        Commands::End { app_id, game_id } => {
            client.app_end(app_id, &game_id).await?;
            Ok(format!("{} app session {}", "Ended".green(), game_id.cyan()))
        }

        Commands::Heartbeat { game_id } => {
            client.heartbeat(&game_id).await?;
            Ok("OK".green().to_string())
        }

        Commands::BatchHeartbeat { game_ids } => {
            let result = client.batch_heartbeat(&game_ids).await?;
            if result.failed_game_ids.is_empty() {
                Ok(format!("{} ({} game(s))", "OK".green(), game_ids.len()))
            } else {
                Ok(format!(
                    "{}: {}",
                    "Failed".yellow(),
                    result.failed_game_ids.join(", ")
                ))
            }
        }

        // Handled directly in main.rs (no credentials needed)
        Commands::Listen { .. } | Commands::Decode { .. } => unreachable!(),
    }
}

/// Decodes one hex-encoded frame and formats every result.
pub fn decode(input: &str) -> Result<String, Box<dyn std::error::Error>> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = hex::decode(cleaned.trim_start_matches("0x"))?;

    let mut output = match FrameHeader::parse(&bytes) {
        Ok(header) => format!(
            "{} total={} header={} encoding={} operation={} sequence={}",
            "Header".bold(),
            header.total_len,
            header.header_len,
            header.encoding.as_u16(),
            header.operation,
            header.sequence
        ),
        Err(_) => format!("{} ({} bytes)", "Header".bold(), bytes.len()),
    };

    let results = Decoder::new().decode(&bytes);
    if results.is_empty() {
        output.push_str(&format!("\n{}", "(no messages)".dimmed()));
    }

    for decoded in results {
        let line = match decoded {
            Decoded::Message(message) => {
                format!("{} {}", "message".green(), serde_json::to_string(&message)?)
            }
            Decoded::AuthReply(reply) => {
                format!("{} {}", "auth-reply".cyan(), serde_json::to_string(&reply)?)
            }
            Decoded::ControlAck => "heartbeat-reply".cyan().to_string(),
            Decoded::Error(e) => format!("{} [{}] {}", "error".red(), e.kind(), e),
        };
        output.push('\n');
        output.push_str(&line);
    }

    Ok(output)
}

/// Reads an argument inline, or from a file when prefixed with `@`.
pub fn read_arg(arg: &str) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(path) = arg.strip_prefix('@') {
        Ok(std::fs::read_to_string(path)?.trim_end().to_string())
    } else {
        Ok(arg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_decode_message_frame() {
        plain();
        // {"cmd":"X"} as a raw pushed event.
        let hex = "0000001b001000000000000500000000 7b22636d64223a2258227d";
        let output = decode(hex).unwrap();
        assert!(output.contains("operation=MESSAGE"));
        assert!(output.contains(r#"message {"cmd":"X"}"#));
    }

    #[test]
    fn test_decode_heartbeat_reply() {
        plain();
        let output = decode("0x00000014001000000000000300000000000001f4").unwrap();
        assert!(output.contains("heartbeat-reply"));
    }

    #[test]
    fn test_decode_short_frame() {
        plain();
        let output = decode("0000").unwrap();
        assert!(output.contains("frame_too_short"));
    }

    #[test]
    fn test_decode_invalid_hex() {
        assert!(decode("zz").is_err());
    }

    #[test]
    fn test_read_arg() {
        assert_eq!(read_arg(r#"{"a":1}"#).unwrap(), r#"{"a":1}"#);
        assert!(read_arg("@/nonexistent/auth.json").is_err());
    }
}
