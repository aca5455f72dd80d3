//! Command implementations for the `liam` binary.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use liam_client::{ClientConfig, ClientError, LiamClient, UserKey};
use liam_core::encoding::from_json_bytes;
use liam_core::{AuthenticatedEnvelope, KeyPair, PublicKey, RequestSigner, signing};
use thiserror::Error;
use tracing::{debug, info};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "liam.toml";

const PRIVATE_KEY_FILE: &str = "private.pem";
const PUBLIC_KEY_FILE: &str = "public.pem";

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Core(#[from] liam_core::Error),

    #[error("{0}")]
    Io(String),
}

type Result<T> = std::result::Result<T, CliError>;

pub enum Command {
    Keygen {
        out_dir: Option<PathBuf>,
    },
    Sign {
        body: String,
        endpoint: Option<String>,
    },
    Verify {
        body: String,
        signature: String,
        public_key: PathBuf,
    },
    CreateProfile {
        name: String,
        identification: String,
    },
    Memory(MemoryCommand),
}

pub enum MemoryCommand {
    Create {
        user_key: String,
        content: String,
        tag: Option<String>,
        session_id: String,
    },
    List {
        user_key: String,
        query: String,
        tokens: Vec<String>,
    },
    Forget {
        user_key: String,
        query_hash: String,
    },
    Tags {
        user_key: String,
    },
}

pub async fn run(command: Command, config_path: Option<&Path>) -> Result<ExitCode> {
    match command {
        Command::Keygen { out_dir } => keygen(out_dir.as_deref()),
        Command::Sign { body, endpoint } => {
            let config = load_config(config_path)?;
            let envelope = sign_body(&config, &read_body(&body)?, endpoint.as_deref().unwrap_or(""))?;
            print!("{}", render_envelope(&envelope));
            Ok(ExitCode::SUCCESS)
        }
        Command::Verify { body, signature, public_key } => {
            let pem = read_file(&public_key)?;
            if verify_body(&pem, &read_body(&body)?, &signature)? {
                println!("valid");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("invalid");
                Ok(ExitCode::FAILURE)
            }
        }
        Command::CreateProfile { name, identification } => {
            let client = LiamClient::from_config(&load_config(config_path)?)?;
            let user_key = client.create_profile(&name, &identification).await?;
            println!("{user_key}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Memory(command) => {
            let client = LiamClient::from_config(&load_config(config_path)?)?;
            let response = match command {
                MemoryCommand::Create { user_key, content, tag, session_id } => {
                    client
                        .create_memory(&UserKey::new(user_key), &content, tag.as_deref(), &session_id)
                        .await?
                }
                MemoryCommand::List { user_key, query, tokens } => {
                    client.list_memories(&UserKey::new(user_key), &query, &tokens).await?
                }
                MemoryCommand::Forget { user_key, query_hash } => {
                    client.forget_memory(&UserKey::new(user_key), &query_hash).await?
                }
                MemoryCommand::Tags { user_key } => client.list_tags(&UserKey::new(user_key)).await?,
            };
            let pretty = serde_json::to_string_pretty(&response)
                .map_err(|e| CliError::Io(format!("cannot print response: {e}")))?;
            println!("{pretty}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Explicit path, else `./liam.toml` if present, else defaults; then `LIAM_*` overrides.
fn load_config(path: Option<&Path>) -> Result<ClientConfig> {
    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    let mut config = match path {
        Some(path) => ClientConfig::load(path)?,
        None if default_path.is_file() => ClientConfig::load(default_path)?,
        None => ClientConfig::default(),
    };
    config.apply_env();
    debug!(base_url = %config.base_url, nonce = ?config.nonce, key_order = ?config.key_order, "configuration loaded");
    Ok(config)
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| CliError::Io(format!("cannot read {}: {e}", path.display())))
}

/// A literal body, or `@FILE` for a file's contents minus one trailing newline.
pub fn read_body(arg: &str) -> Result<Vec<u8>> {
    let Some(path) = arg.strip_prefix('@') else {
        return Ok(arg.as_bytes().to_vec());
    };
    let mut bytes =
        std::fs::read(path).map_err(|e| CliError::Io(format!("cannot read body file {path}: {e}")))?;
    if bytes.ends_with(b"\n") {
        bytes.pop();
        if bytes.ends_with(b"\r") {
            bytes.pop();
        }
    }
    Ok(bytes)
}

pub fn sign_body(config: &ClientConfig, body: &[u8], endpoint: &str) -> Result<AuthenticatedEnvelope> {
    let credentials = config.credentials()?;
    let value = from_json_bytes(body)?;
    let envelope = RequestSigner::new(&credentials)
        .nonce(config.nonce)
        .key_order(config.key_order)
        .build(endpoint, &value)?;
    Ok(envelope)
}

/// Headers, a blank line, then the canonical body, as they would go on the wire.
pub fn render_envelope(envelope: &AuthenticatedEnvelope) -> String {
    let mut out = String::new();
    if !envelope.endpoint().is_empty() {
        let _ = writeln!(out, "POST {}", envelope.endpoint());
    }
    for (name, value) in envelope.headers() {
        let _ = writeln!(out, "{name}: {value}");
    }
    let _ = writeln!(out, "\n{}", envelope.body());
    out
}

pub fn verify_body(public_key_pem: &str, body: &[u8], signature: &str) -> Result<bool> {
    let public_key = PublicKey::from_pem(public_key_pem)?;
    Ok(signing::verify_base64(&public_key, body, signature)?)
}

fn keygen(out_dir: Option<&Path>) -> Result<ExitCode> {
    let key_pair = KeyPair::generate();
    let public_key = key_pair.public_key();
    let private_pem = key_pair.to_pkcs8_pem()?;
    let public_pem = public_key.to_pem()?;
    info!(fingerprint = %public_key.fingerprint(), "generated P-256 key pair");

    let Some(dir) = out_dir else {
        print!("{private_pem}{public_pem}");
        return Ok(ExitCode::SUCCESS);
    };

    let (private_path, public_path) = write_key_files(dir, &private_pem, &public_pem)?;
    println!("{}", private_path.display());
    println!("{}", public_path.display());
    Ok(ExitCode::SUCCESS)
}

/// Write both PEM files into `dir`. Existing key files are never overwritten.
pub fn write_key_files(dir: &Path, private_pem: &str, public_pem: &str) -> Result<(PathBuf, PathBuf)> {
    let private_path = dir.join(PRIVATE_KEY_FILE);
    let public_path = dir.join(PUBLIC_KEY_FILE);
    for path in [&private_path, &public_path] {
        if path.exists() {
            return Err(CliError::Io(format!("{} already exists", path.display())));
        }
    }

    let io_err = |path: &Path, e: std::io::Error| CliError::Io(format!("cannot write {}: {e}", path.display()));
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    std::fs::write(&private_path, private_pem).map_err(|e| io_err(&private_path, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&private_path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| io_err(&private_path, e))?;
    }
    std::fs::write(&public_path, public_pem).map_err(|e| io_err(&public_path, e))?;
    Ok((private_path, public_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("liam-cli-{name}-{}", std::process::id()))
    }

    fn config_with(key_pair: &KeyPair) -> ClientConfig {
        ClientConfig {
            api_key: Some("cli-key".into()),
            private_key_pem: Some(key_pair.to_pkcs8_pem().unwrap()),
            ..Default::default()
        }
    }

    #[test]
    fn literal_and_file_bodies() {
        assert_eq!(read_body(r#"{"a":1}"#).unwrap(), br#"{"a":1}"#);

        let dir = temp_dir("body");
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("body.json");
        std::fs::write(&file, "{\"a\":1}\r\n").unwrap();
        assert_eq!(read_body(&format!("@{}", file.display())).unwrap(), br#"{"a":1}"#);
        std::fs::remove_dir_all(&dir).unwrap();

        assert!(matches!(read_body("@/definitely/not/here.json"), Err(CliError::Io(_))));
    }

    #[test]
    fn sign_then_verify() {
        let key_pair = KeyPair::generate();
        let public_pem = key_pair.public_key().to_pem().unwrap();
        let envelope = sign_body(&config_with(&key_pair), r#"{"b":1,"a":"é"}"#.as_bytes(), "memory/create").unwrap();

        assert_eq!(envelope.body().as_str(), r#"{"a":"\u00e9","b":1}"#);
        let signature = envelope.signature().to_base64();
        assert!(verify_body(&public_pem, envelope.body().as_bytes(), &signature).unwrap());
        assert!(!verify_body(&public_pem, br#"{"a":"\u00e9","b":2}"#, &signature).unwrap());
    }

    #[test]
    fn verify_rejects_garbage_signature() {
        let public_pem = KeyPair::generate().public_key().to_pem().unwrap();
        let err = verify_body(&public_pem, b"{}", "not base64!").unwrap_err();
        match err {
            CliError::Core(e) => assert_eq!(e.kind(), "InvalidSignatureEncodingError"),
            other => panic!("expected a signature encoding error, got {other:?}"),
        }
    }

    #[test]
    fn sign_rejects_invalid_json() {
        let key_pair = KeyPair::generate();
        let err = sign_body(&config_with(&key_pair), b"{not json", "").unwrap_err();
        assert!(matches!(err, CliError::Core(ref e) if e.kind() == "EncodingError"), "{err}");
    }

    #[test]
    fn sign_refuses_bodies_it_would_alter() {
        let config = config_with(&KeyPair::generate());
        for body in [&br#"{"a":1,"a":2}"#[..], br#"{"n":18446744073709551616}"#] {
            let err = sign_body(&config, body, "memory/create").unwrap_err();
            assert!(matches!(err, CliError::Core(ref e) if e.kind() == "EncodingError"), "{err}");
        }

        let envelope = sign_body(&config, br#"{"n":-0}"#, "memory/create").unwrap();
        assert_eq!(envelope.body().as_str(), r#"{"n":0}"#);
    }

    #[test]
    fn rendered_envelope_lists_headers_then_body() {
        let key_pair = KeyPair::generate();
        let envelope = sign_body(&config_with(&key_pair), br#"{"userKey":"uk_1"}"#, "memory/list-tag").unwrap();
        let rendered = render_envelope(&envelope);
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "POST memory/list-tag");
        assert_eq!(lines[1], "Content-Type: application/json");
        assert_eq!(lines[2], "apiKey: cli-key");
        assert!(lines[3].starts_with("signature: "));
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], r#"{"userKey":"uk_1"}"#);
    }

    #[test]
    fn key_files_round_trip_and_never_overwrite() {
        let dir = temp_dir("keygen");
        let key_pair = KeyPair::generate();
        let private_pem = key_pair.to_pkcs8_pem().unwrap();
        let public_pem = key_pair.public_key().to_pem().unwrap();

        let (private_path, public_path) = write_key_files(&dir, &private_pem, &public_pem).unwrap();
        let loaded = KeyPair::from_pem(&std::fs::read_to_string(&private_path).unwrap()).unwrap();
        let public = PublicKey::from_pem(&std::fs::read_to_string(&public_path).unwrap()).unwrap();
        assert_eq!(loaded.public_key().fingerprint(), public.fingerprint());

        assert!(matches!(write_key_files(&dir, &private_pem, &public_pem), Err(CliError::Io(_))));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
