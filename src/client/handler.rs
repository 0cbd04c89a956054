use log::{error, info};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, BufReader};

use crate::client::Session;
use crate::error::{ProtocolError, ServerError};
use crate::middleware::logging::log_command;
use crate::protocol::responses::{self, Reply};
use crate::protocol::{CommandStatus, error_reply, handle_command, parse_command, write_reply};

/// Handles a client session.
///
/// - Greets the client, then reads command lines with a BufReader.
/// - Dispatches commands using `handle_command`, which may read an upload
///   body from the same buffered reader.
/// - An over-long line closes the session since the rest of it cannot be
///   told apart from the next command.
pub async fn handle_client<S>(stream: S, session: Session)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let client_addr = session.client_addr;
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    if let Err(e) = write_reply(
        &mut write_half,
        Reply::message(responses::READY, "Sandbox explorer ready"),
    )
    .await
    {
        error!("Failed to greet {}: {}", client_addr, e);
        return;
    }

    // room for the line ending
    let limit = session.max_command_length as u64 + 2;

    loop {
        line.clear();
        match (&mut reader).take(limit).read_line(&mut line).await {
            Ok(0) => {
                info!("Connection closed by client {}", client_addr);
                break;
            }
            Ok(read) => {
                if read as u64 >= limit && !line.ends_with('\n') {
                    let err = ServerError::from(ProtocolError::CommandTooLong(
                        session.max_command_length,
                    ));
                    let _ = write_reply(&mut write_half, error_reply(&err)).await;
                    break;
                }

                let command = parse_command(&line);
                log_command(&client_addr, &command);

                match handle_command(command, &session, &mut reader, &mut write_half).await {
                    Ok(CommandStatus::Continue) => {}
                    Ok(CommandStatus::CloseConnection) => {
                        info!("Closing session for {}", client_addr);
                        break;
                    }
                    Err(e) => {
                        error!("Failed to reply to {}: {}", client_addr, e);
                        break;
                    }
                }
            }
            Err(e) => {
                error!("Failed to read from {}: {}", client_addr, e);
                break;
            }
        }
    }

    info!("Client {} disconnected", client_addr);
}
