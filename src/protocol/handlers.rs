//! Command handlers module for the sandbox explorer.
//!
//! Dispatches parsed commands to the storage, archive, search and preview
//! operations and turns their results into replies. Filesystem work runs on
//! tokio's blocking pool so one slow tree walk never stalls other sessions.

use log::{info, warn};
use serde::Serialize;
use std::io::{self, Cursor};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use crate::archive;
use crate::client::Session;
use crate::error::{ProtocolError, ServerError, error_to_status_code, handle_error};
use crate::preview::{self, PreviewResult};
use crate::protocol::commands::{Command, CommandStatus};
use crate::protocol::requests::UploadRequest;
use crate::protocol::responses::{self, Reply, write_reply};
use crate::search;
use crate::storage::{self, PathResolver};

/// Executes a command and writes its reply.
///
/// `reader` is the session's command stream; only STOR reads from it, to
/// receive the upload body that follows its acceptance.
pub async fn handle_command<R, W>(
    command: Command,
    session: &Session,
    reader: &mut R,
    writer: &mut W,
) -> io::Result<CommandStatus>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let reply = match command {
        Command::Quit => {
            write_reply(writer, Reply::message(responses::CLOSING, "Goodbye")).await?;
            return Ok(CommandStatus::CloseConnection);
        }
        Command::Stor(request) => return handle_stor(request, session, reader, writer).await,
        other => match execute(other, session).await {
            Ok(reply) => reply,
            Err(e) => error_reply(&e),
        },
    };

    write_reply(writer, reply).await?;
    Ok(CommandStatus::Continue)
}

async fn execute(command: Command, session: &Session) -> Result<Reply, ServerError> {
    let resolver = &session.resolver;

    match command {
        Command::List(path) => {
            let listing = run_blocking(resolver, move |r| storage::list_directory(r, &path)).await?;
            json_reply(&listing)
        }
        Command::Retr(path) => {
            let info = run_blocking(resolver, move |r| storage::prepare_download(r, &path)).await?;
            Ok(Reply::file(
                preview::DEFAULT_CONTENT_TYPE,
                info.file_path,
                Some(info.file_name),
            ))
        }
        Command::Mkd(path) => {
            let text = format!("Created directory {}", path);
            run_blocking(resolver, move |r| storage::create_directory(r, &path)).await?;
            Ok(Reply::message(responses::ACTION_OK, text))
        }
        Command::Dele(path) => {
            let text = format!("Deleted {}", path);
            run_blocking(resolver, move |r| storage::delete_path(r, &path)).await?;
            Ok(Reply::message(responses::ACTION_OK, text))
        }
        Command::Move(pair) => {
            let text = format!("Moved {} to {}", pair.from, pair.to);
            run_blocking(resolver, move |r| storage::move_path(r, &pair.from, &pair.to)).await?;
            Ok(Reply::message(responses::ACTION_OK, text))
        }
        Command::Copy(pair) => {
            let text = format!("Copied {} to {}", pair.from, pair.to);
            run_blocking(resolver, move |r| storage::copy_path(r, &pair.from, &pair.to)).await?;
            Ok(Reply::message(responses::ACTION_OK, text))
        }
        Command::Zip(list) => {
            let archive = run_blocking(resolver, move |r| archive::zip_paths(r, &list.paths)).await?;
            Ok(Reply::bytes(responses::ZIP_CONTENT_TYPE, archive))
        }
        Command::Search(query) => {
            let result = run_blocking(resolver, move |r| search::search(r, &query)).await?;
            json_reply(&result)
        }
        Command::Preview(path) => {
            match run_blocking(resolver, move |r| preview::preview(r, &path)).await? {
                PreviewResult::File {
                    file_path,
                    content_type,
                } => Ok(Reply::file(content_type, file_path, None)),
                PreviewResult::Content { body, content_type } => {
                    Ok(Reply::bytes(content_type, body.into_bytes()))
                }
            }
        }
        Command::Noop => Ok(Reply::message(responses::OK, "OK")),
        Command::Invalid(reason) => Err(ProtocolError::MalformedArgument(reason).into()),
        Command::Unknown(raw) => {
            warn!("Unknown command from {}: {:?}", session.client_addr, raw);
            Ok(Reply::message(responses::SYNTAX_ERROR, "Unknown command"))
        }
        Command::Quit | Command::Stor(_) => Err(ServerError::Internal(
            "command must be handled by the session".into(),
        )),
    }
}

/// Accept an upload: validate the target, announce readiness, read exactly
/// `size` bytes, then store them.
async fn handle_stor<R, W>(
    request: UploadRequest,
    session: &Session,
    reader: &mut R,
    writer: &mut W,
) -> io::Result<CommandStatus>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let limit = session.max_upload_bytes;
    if request.size > limit {
        let err = ServerError::from(ProtocolError::PayloadTooLarge {
            size: request.size,
            limit,
        });
        write_reply(writer, error_reply(&err)).await?;
        return Ok(CommandStatus::Continue);
    }

    let folder = request.path.clone();
    let file_name = request.file_name.clone();
    if let Err(e) =
        run_blocking(&session.resolver, move |r| storage::prepare_upload(r, &folder, &file_name)).await
    {
        write_reply(writer, error_reply(&e)).await?;
        return Ok(CommandStatus::Continue);
    }

    write_reply(
        writer,
        Reply::message(
            responses::OPENING_DATA,
            format!("Ready for {} bytes", request.size),
        ),
    )
    .await?;

    let mut body = Vec::new();
    let received = (&mut *reader).take(request.size).read_to_end(&mut body).await? as u64;
    if received < request.size {
        warn!(
            "Upload from {} aborted after {} of {} bytes",
            session.client_addr, received, request.size
        );
        return Ok(CommandStatus::CloseConnection);
    }

    let UploadRequest {
        path, file_name, ..
    } = request;
    let result = run_blocking(&session.resolver, move |r| {
        storage::upload_file(r, &path, &file_name, &mut Cursor::new(body))
    })
    .await;

    let reply = match result {
        Ok(written) => {
            info!("Client {} uploaded {} bytes", session.client_addr, written);
            Reply::message(
                responses::TRANSFER_COMPLETE,
                format!("Stored {} bytes", written),
            )
        }
        Err(e) => error_reply(&e),
    };
    write_reply(writer, reply).await?;
    Ok(CommandStatus::Continue)
}

/// Run a blocking operation against the resolver on the blocking pool.
async fn run_blocking<T, E, F>(resolver: &Arc<PathResolver>, op: F) -> Result<T, ServerError>
where
    F: FnOnce(&PathResolver) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ServerError> + Send + 'static,
{
    let resolver = Arc::clone(resolver);
    tokio::task::spawn_blocking(move || op(&resolver))
        .await
        .map_err(|e| ServerError::Internal(format!("blocking task failed: {}", e)))?
        .map_err(Into::into)
}

fn json_reply<T: Serialize>(value: &T) -> Result<Reply, ServerError> {
    let body = serde_json::to_vec(value)
        .map_err(|e| ServerError::Internal(format!("serialization failed: {}", e)))?;
    Ok(Reply::bytes(responses::JSON_CONTENT_TYPE, body))
}

/// Log an error and turn it into a reply line
pub fn error_reply(err: &ServerError) -> Reply {
    handle_error(err);
    Reply::message(error_to_status_code(err), err.to_string())
}
