//! Purpose: Hold top-level CLI command dispatch for `recops`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Every argument is parsed before the store directory is opened.
//! Invariants: Pure writes print nothing; reads print one JSON value.

use super::*;
use recops::api::{Client, StoreOptions, build_key, metadata_json, parse_bin_names, parse_operations};

pub(super) fn dispatch_command(
    command: Command,
    store_dir: PathBuf,
    default_ttl: u32,
) -> Result<RunOutcome, Error> {
    let open = || Client::open_dir(&store_dir, StoreOptions::new().with_default_ttl(default_ttl));

    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "recops", &mut io::stdout());
        }
        Command::Version => emit_version_output(),
        Command::Operate {
            key,
            operations,
            options,
        } => {
            let key = parse_inline_json("key", &key)?;
            let operations = parse_operations(&parse_inline_json("operations", &operations)?)?;
            let key = build_key(&key)?;
            let options = parse_options(options.as_deref())?;
            let bins = open()?.operate(&key, operations, options.as_ref())?;
            emit_json(Value::Object(bins));
        }
        Command::Append {
            key,
            bin,
            text,
            options,
        } => {
            let key = build_key(&parse_inline_json("key", &key)?)?;
            let options = parse_options(options.as_deref())?;
            open()?.append(&key, &bin, &text, options.as_ref())?;
        }
        Command::Prepend {
            key,
            bin,
            text,
            options,
        } => {
            let key = build_key(&parse_inline_json("key", &key)?)?;
            let options = parse_options(options.as_deref())?;
            open()?.prepend(&key, &bin, &text, options.as_ref())?;
        }
        Command::Increment {
            key,
            bin,
            offset,
            initial,
            options,
        } => {
            let key = build_key(&parse_inline_json("key", &key)?)?;
            let options = parse_options(options.as_deref())?;
            open()?.increment(&key, &bin, offset, initial, options.as_ref())?;
        }
        Command::Touch { key, ttl, options } => {
            let key = build_key(&parse_inline_json("key", &key)?)?;
            let options = parse_options(options.as_deref())?;
            open()?.touch(&key, ttl, options.as_ref())?;
        }
        Command::Exists { key, options } => {
            let key = build_key(&parse_inline_json("key", &key)?)?;
            let options = parse_options(options.as_deref())?;
            let metadata = open()?.exists(&key, options.as_ref())?;
            emit_json(metadata_json(&metadata));
        }
        Command::Remove { key, options } => {
            let key = build_key(&parse_inline_json("key", &key)?)?;
            let options = parse_options(options.as_deref())?;
            open()?.remove(&key, options.as_ref())?;
        }
        Command::RemoveBins { key, bins, options } => {
            let key = build_key(&parse_inline_json("key", &key)?)?;
            let bins = parse_bin_names(&parse_inline_json("bins", &bins)?)?;
            let options = parse_options(options.as_deref())?;
            open()?.remove_bins(&key, &bins, options.as_ref())?;
        }
        Command::Get { key, bins, options } => {
            let key = build_key(&parse_inline_json("key", &key)?)?;
            let options = parse_options(options.as_deref())?;
            let selected = (!bins.is_empty()).then_some(bins.as_slice());
            let record = open()?.get(&key, selected, options.as_ref())?;
            emit_json(record.to_json());
        }
        Command::Put { key, bins, options } => {
            let key = build_key(&parse_inline_json("key", &key)?)?;
            let bins = match parse_inline_json("bins", &bins)? {
                Value::Object(bins) => bins,
                _ => {
                    return Err(Error::new(ErrorKind::Param)
                        .with_message("bins must be a JSON object")
                        .with_hint("For example: '{\"name\":\"ada\",\"visits\":1}'."));
                }
            };
            let options = parse_options(options.as_deref())?;
            open()?.put(&key, &bins, options.as_ref())?;
        }
    }
    Ok(RunOutcome::ok())
}

fn parse_options(options: Option<&str>) -> Result<Option<Value>, Error> {
    options
        .map(|options| parse_inline_json("options", options))
        .transpose()
}
