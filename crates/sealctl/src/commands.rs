//! Subcommand implementations.
//!
//! Record commands stream JSON lines: one [`RecordLine`] in, one out, in
//! order. The first failing line aborts the run; lines already written stay
//! written.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use common::{RecordLine, SecurityError};
use security::model::ModelRegistry;
use security::token::ApplicationSecret;
use security::{FieldCipher, SecurityConfig, SecurityContext, TokenDeriver};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::cli::{RecordArgs, RekeyArgs, TokenArgs};

/// Outcome of `token check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Valid,
    Invalid,
}

/// `token issue`.
pub fn issue_token(ctx: &SecurityContext, args: &TokenArgs) -> Result<String, SecurityError> {
    match args.scope.verifiable() {
        Some(scope) => ctx.deriver.token(scope, &args.context, &args.suffix),
        None => ctx.deriver.static_token(&args.context, &args.suffix),
    }
}

/// `token check`.
pub fn check_token(ctx: &SecurityContext, args: &TokenArgs, token: &str) -> Result<CheckOutcome> {
    let scope = args
        .scope
        .verifiable()
        .context("static tokens are key material and cannot be checked")?;
    if ctx.deriver.check(scope, &args.context, &args.suffix, token) {
        Ok(CheckOutcome::Valid)
    } else {
        Ok(CheckOutcome::Invalid)
    }
}

/// Which way a record command moves field values.
pub enum RecordOp {
    Encrypt(Arc<FieldCipher>),
    Decrypt(Arc<FieldCipher>),
    Rekey {
        from: Arc<FieldCipher>,
        to: FieldCipher,
    },
}

impl RecordOp {
    fn label(&self) -> &'static str {
        match self {
            RecordOp::Encrypt(_) => "encrypt",
            RecordOp::Decrypt(_) => "decrypt",
            RecordOp::Rekey { .. } => "rekey",
        }
    }

    fn apply(&self, record: &mut RecordLine, fields: &[String]) -> Result<(), SecurityError> {
        match self {
            RecordOp::Encrypt(cipher) => cipher.encrypt_fields(record, fields).map(|_| ()),
            RecordOp::Decrypt(cipher) => cipher.decrypt_fields(record, fields).map(|_| ()),
            RecordOp::Rekey { from, to } => {
                let mut plain = record.clone();
                from.decrypt_fields(&mut plain, fields)?;
                to.encrypt_fields(&mut plain, fields)?;
                *record = plain;
                Ok(())
            }
        }
    }
}

/// Build the target cipher for `rekey` from the new secret and database hash.
pub fn rekey_target(cfg: &SecurityConfig, args: &RekeyArgs) -> Result<FieldCipher, SecurityError> {
    let secret = std::env::var(&args.new_app_hash_var).unwrap_or_default();
    let secret = ApplicationSecret::new(secret).map_err(|_| {
        SecurityError::ConfigurationMissing(format!("{} is unset", args.new_app_hash_var))
    })?;
    let database_hash = args
        .new_database_hash
        .as_deref()
        .unwrap_or(&cfg.database_hash);
    FieldCipher::new(&TokenDeriver::with_system_clock(secret), database_hash)
}

/// Run a record command from `args.input` (or stdin) into `writer`.
pub async fn run_records<W>(
    registry: &ModelRegistry,
    args: &RecordArgs,
    op: RecordOp,
    writer: W,
) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    match &args.input {
        Some(path) => {
            let file = open_input(path).await?;
            transform_lines(file, writer, registry, &args.fields, &op).await
        }
        None => transform_lines(tokio::io::stdin(), writer, registry, &args.fields, &op).await,
    }
}

async fn open_input(path: &Path) -> Result<tokio::fs::File> {
    tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open input {}", path.display()))
}

/// Stream JSON-lines records from `reader` to `writer`, applying `op`.
///
/// Returns the number of records written.
pub async fn transform_lines<R, W>(
    reader: R,
    mut writer: W,
    registry: &ModelRegistry,
    explicit_fields: &[String],
    op: &RecordOp,
) -> Result<usize>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut line_no = 0usize;
    let mut written = 0usize;

    while let Some(line) = lines.next_line().await.context("failed to read input")? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let mut record: RecordLine = serde_json::from_str(&line)
            .with_context(|| format!("line {line_no}: not a valid record"))?;

        let fields: Arc<[String]> = if explicit_fields.is_empty() {
            registry
                .get(&record.model)
                .with_context(|| format!("line {line_no}: no encrypt fields configured"))?
        } else {
            explicit_fields.iter().cloned().collect()
        };

        if let Err(e) = op.apply(&mut record, &fields) {
            warn!(line = line_no, code = e.code(), op = op.label(), "record transform failed");
            return Err(anyhow::Error::new(e).context(format!("line {line_no}")));
        }

        let mut out = serde_json::to_string(&record).context("failed to serialise record")?;
        out.push('\n');
        writer
            .write_all(out.as_bytes())
            .await
            .context("failed to write output")?;
        written += 1;
    }

    writer.flush().await.context("failed to flush output")?;
    info!(records = written, op = op.label(), "records processed");
    Ok(written)
}
