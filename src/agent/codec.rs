//! Line codec for the traffic-control agent protocol.
//!
//! Outbound commands, one per line:
//!
//! | Command                        | Wire form                                     |
//! |--------------------------------|-----------------------------------------------|
//! | [`AgentCommand::SetInterface`] | `Interface: <name>`                           |
//! | [`AgentCommand::SetGlobalLimit`] | `Global:  <dl> <ul> <dlmin> <ulmin>`        |
//! | [`AgentCommand::SetProcessLimit`] | `Program: <name> <dl> <ul> <dlmin> <ulmin>` |
//! | [`AgentCommand::Stop`]         | `Stop`                                        |
//!
//! Rates render as `None` or `<integer><unit>` with a lower-case unit. The
//! agent splits fields on whitespace and frames on `\n` only, so names that
//! contain whitespace cannot be sent.
//!
//! Inbound payloads are either the literal `Stop` or zero or more
//! `ProgramEntry: <name>` lines.
//!
//! Use [`AgentCodec`] with [`tokio_util::codec::FramedWrite`] for the
//! outbound direction. There is no matching `Decoder`: the agent gives no
//! framing guarantee for its output, so [`decode_payload`] works on whatever
//! a single read returned.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::models::discovery::{DiscoveredProcess, PollOutcome};
use crate::models::limit::{LimitSpec, LimitTarget};
use crate::models::rate::LimitValue;
use crate::{AppError, Result};

/// Prefix of every discovery line emitted by the agent.
pub const PROGRAM_ENTRY_PREFIX: &str = "ProgramEntry: ";

/// Stop command and stop acknowledgement literal.
pub const STOP: &str = "Stop";

/// A single command sent to the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentCommand {
    /// Select the network interface to shape.
    SetInterface(String),
    /// Apply interface-wide limits. The spec must target [`LimitTarget::Global`].
    SetGlobalLimit(LimitSpec),
    /// Apply per-process limits. The spec must target a named process.
    SetProcessLimit(LimitSpec),
    /// Ask the agent to clean up and exit.
    Stop,
}

impl AgentCommand {
    /// Short name used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetInterface(_) => "interface",
            Self::SetGlobalLimit(_) => "global",
            Self::SetProcessLimit(_) => "program",
            Self::Stop => "stop",
        }
    }
}

/// Encode `command` as a single line without its terminator.
///
/// # Errors
///
/// Returns [`AppError::Protocol`] if an interface or process name is empty
/// or contains whitespace, or if the spec's target does not match the
/// command (a named spec sent as global or vice versa).
pub fn encode_command(command: &AgentCommand) -> Result<String> {
    match command {
        AgentCommand::SetInterface(name) => {
            check_name("interface", name)?;
            Ok(format!("Interface: {name}"))
        }
        AgentCommand::SetGlobalLimit(spec) => {
            if spec.target != LimitTarget::Global {
                return Err(AppError::Protocol(
                    "global limit command requires a global spec".into(),
                ));
            }
            Ok(format!("Global:  {}", render_rates(spec)))
        }
        AgentCommand::SetProcessLimit(spec) => {
            let name = spec.process_name().ok_or_else(|| {
                AppError::Protocol("program limit command requires a named spec".into())
            })?;
            check_name("process", name)?;
            Ok(format!("Program: {name} {}", render_rates(spec)))
        }
        AgentCommand::Stop => Ok(STOP.to_owned()),
    }
}

/// Render the four rate fields in wire order: download, upload,
/// download minimum, upload minimum.
#[must_use]
pub fn render_rates(spec: &LimitSpec) -> String {
    format!(
        "{} {} {} {}",
        render_rate(spec.download.as_ref()),
        render_rate(spec.upload.as_ref()),
        render_rate(spec.download_minimum.as_ref()),
        render_rate(spec.upload_minimum.as_ref()),
    )
}

fn render_rate(value: Option<&LimitValue>) -> String {
    value.map_or_else(|| "None".to_owned(), ToString::to_string)
}

fn check_name(what: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(AppError::Protocol(format!("{what} name must not be empty")));
    }
    if name.contains('\n') {
        return Err(AppError::Protocol(format!(
            "{what} name {name:?} contains a newline"
        )));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(AppError::Protocol(format!(
            "{what} name {name:?} contains whitespace"
        )));
    }
    Ok(())
}

/// Decode one chunk of agent output.
///
/// A payload that is exactly `Stop` (optionally followed by the line
/// terminator the agent writes) is the stop acknowledgement. Anything else
/// is parsed as discovery lines; blank lines are skipped.
///
/// # Errors
///
/// Returns [`AppError::Protocol`] if a non-blank line lacks the
/// `ProgramEntry: ` prefix or names nothing.
pub fn decode_payload(payload: &str) -> Result<PollOutcome> {
    if payload.trim_end_matches(['\r', '\n']) == STOP {
        return Ok(PollOutcome::Stopped);
    }

    let mut discovered = Vec::new();
    for line in payload.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let name = line.strip_prefix(PROGRAM_ENTRY_PREFIX).ok_or_else(|| {
            AppError::Protocol(format!("unexpected agent output line: {line:?}"))
        })?;
        if name.is_empty() {
            return Err(AppError::Protocol(
                "program entry without a process name".into(),
            ));
        }
        discovered.push(DiscoveredProcess {
            name: name.to_owned(),
        });
    }

    Ok(PollOutcome::Discovered(discovered))
}

/// Decode raw bytes from one read of the agent's stdout.
///
/// # Errors
///
/// Returns [`AppError::Protocol`] if the bytes are not UTF-8 or
/// [`decode_payload`] rejects them.
pub fn decode_bytes(raw: &[u8]) -> Result<PollOutcome> {
    let payload = std::str::from_utf8(raw)
        .map_err(|err| AppError::Protocol(format!("agent output is not utf-8: {err}")))?;
    decode_payload(payload)
}

/// Newline-terminated encoder for [`AgentCommand`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct AgentCodec;

impl AgentCodec {
    /// Create a new codec.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Encoder<AgentCommand> for AgentCodec {
    type Error = AppError;

    /// Encode `item` as `line\n` into `dst`.
    ///
    /// Nothing is written to `dst` when encoding fails.
    fn encode(&mut self, item: AgentCommand, dst: &mut BytesMut) -> Result<()> {
        let line = encode_command(&item)?;
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}
