mod argsets;
mod command;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use env_logger::Env;
use fiware_admin::config;
use fiware_admin::constants::{defaults, envvars};
use fiware_admin::data_mgmt::models::MeasurementRequest;
use fiware_admin::helpers::load_dotenv;
use fiware_admin::interfaces::FiwareClient;

use argsets::{CommonArgs, GenerateArgs, QueryArgs, UploadArgs};

const CMD_FETCH: &str = "fetch";
const CMD_COUNT: &str = "count";
const CMD_DELETE: &str = "delete";
const CMD_UPLOAD: &str = "upload";
const CMD_GENERATE: &str = "generate";
const CMD_QUERY: &str = "query";

const HELP: &str = "\
Usage: fiware-admin <SUBCOMMAND> -c <CONFIG> [OPTIONS]

Subcommands:
  fetch                      Print all entities
  count                      Print the number of entities
  delete                     Delete all entities
  upload <FILE>              Upload the entities in a JSON file
  generate                   Generate and upload random measurements
  query <URN> <ATTRIBUTE>    Print the latest value of an attribute

Options:
  -c, --config <FILE>        Connection config (required)
  -s, --service <NAME>       fiware-service header, overrides the config
  -t, --type <TYPE>          Restrict to one entity type
      --key-values           Upload entities in keyValues format
      --max-bytes <N>        Maximum request payload size in bytes
      --auto-batch           (upload) Split the upload into batches
  -m, --min <N>              (generate) Lowest value
  -M, --max <N>              (generate) Highest value
  -b, --count <N>            (generate) Number of measurements
      --metadata <FILE>      (generate) Attributes added to every measurement
";

fn main() -> Result<()> {
    let dotenv_loaded = load_dotenv();
    env_logger::Builder::from_env(Env::default().filter_or(envvars::LOG_LEVEL, defaults::LOG_LEVEL))
        .init();
    if dotenv_loaded {
        log::debug!("Loaded local .env");
    }

    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let subcommand = args.subcommand()?;
    let common = parse_common_args(&mut args)?;
    match subcommand.as_deref() {
        Some(CMD_FETCH) => {
            finish(args)?;
            command::fetch(&connect(&common)?, &common)
        }
        Some(CMD_COUNT) => {
            finish(args)?;
            command::count(&connect(&common)?, &common)
        }
        Some(CMD_DELETE) => {
            finish(args)?;
            command::delete(&connect(&common)?, &common)
        }
        Some(CMD_UPLOAD) => {
            let auto_batch = args.contains("--auto-batch");
            let data_file: PathBuf = args
                .opt_free_from_str()?
                .ok_or_else(|| anyhow!("upload needs the path of a JSON data file"))?;
            finish(args)?;
            command::upload(
                &connect(&common)?,
                &common,
                UploadArgs {
                    data_file,
                    auto_batch,
                },
            )
        }
        Some(CMD_GENERATE) => {
            let generate_args = GenerateArgs {
                min: args
                    .opt_value_from_str(["-m", "--min"])?
                    .unwrap_or(defaults::GENERATED_MIN),
                max: args
                    .opt_value_from_str(["-M", "--max"])?
                    .unwrap_or(defaults::GENERATED_MAX),
                count: args
                    .opt_value_from_str(["-b", "--count"])?
                    .unwrap_or(defaults::GENERATED_COUNT),
                metadata_file: args.opt_value_from_str("--metadata")?,
            };
            finish(args)?;
            command::generate(&connect(&common)?, &common, generate_args)
        }
        Some(CMD_QUERY) => {
            let request = MeasurementRequest {
                urn: args.free_from_str().context("query needs an entity URN")?,
                name: args
                    .free_from_str()
                    .context("query needs an attribute name")?,
            };
            finish(args)?;
            command::query(&connect(&common)?, QueryArgs { request })
        }
        _ => Err(anyhow!(
            "Subcommand must be one of 'fetch', 'count', 'delete', 'upload', 'generate', 'query'"
        )),
    }
}

fn parse_common_args(args: &mut pico_args::Arguments) -> Result<CommonArgs> {
    Ok(CommonArgs {
        config: args
            .opt_value_from_str(["-c", "--config"])?
            .ok_or_else(|| anyhow!("a config file must be given with -c/--config"))?,
        service: args.opt_value_from_str(["-s", "--service"])?,
        entity_type: args.opt_value_from_str(["-t", "--type"])?,
        key_values: args.contains("--key-values"),
        max_bytes: args
            .opt_value_from_str("--max-bytes")?
            .unwrap_or(defaults::MAX_BATCH_BYTES),
    })
}

fn finish(args: pico_args::Arguments) -> Result<()> {
    let remaining = args.finish();
    if !remaining.is_empty() {
        return Err(anyhow!("Unexpected arguments: {:?}", remaining));
    }
    Ok(())
}

fn connect(common: &CommonArgs) -> Result<FiwareClient> {
    let mut config = config::load(&common.config)?;
    if let Some(service) = &common.service {
        config = config.with_service(service.as_str());
    }
    log::debug!("Using Orion endpoint {}", config.endpoint);
    Ok(FiwareClient::new(&config))
}
