//! `roster run` / `roster validate`: config-driven roster reconciliation.

use std::path::{Path, PathBuf};

use clap::Subcommand;

use roster_recon::config::{ReconConfig, RosterConfig};
use roster_recon::model::{CarryOver, MemberRecord, ReconInput, ReconResult};
use roster_recon::normalize::NormalizeContext;

use crate::exit_codes::{EXIT_RECON_ACTIONS, EXIT_RECON_INVALID_CONFIG, EXIT_RECON_RUNTIME};
use crate::CliError;

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Reconcile the rosters named in a TOML config file
    #[command(after_help = "\
Examples:
  roster run acme-gmc.recon.toml
  roster run acme-gmc.recon.toml --json
  roster run acme-gmc.recon.toml --output result.json
  roster -v run acme-gmc.recon.toml --fail-on-actions")]
    Run {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Output JSON to stdout instead of only the human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file (overrides `[output] json`)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Exit with 62 when any bucket other than perfect-match is non-empty
        #[arg(long)]
        fail_on_actions: bool,
    },

    /// Validate a recon config without running
    #[command(after_help = "\
Examples:
  roster validate acme-gmc.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },
}

pub fn cmd_recon(cmd: ReconCommands) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Run { config, json, output, fail_on_actions } => {
            cmd_recon_run(config, json, output, fail_on_actions)
        }
        ReconCommands::Validate { config } => cmd_recon_validate(config),
    }
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn read_config(config_path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("cannot read config: {e}")))?;
    ReconConfig::from_toml(&config_str).map_err(|e| CliError {
        code: EXIT_RECON_INVALID_CONFIG,
        message: e.to_string(),
        hint: Some(format!("check {} against the column mapping reference", config_path.display())),
    })
}

fn load_roster(
    base_dir: &Path,
    label: &str,
    roster: &RosterConfig,
    ctx: &NormalizeContext,
) -> Result<Vec<MemberRecord>, CliError> {
    let csv_path = base_dir.join(&roster.file);
    let csv_data = std::fs::read_to_string(&csv_path).map_err(|e| {
        recon_err(EXIT_RECON_RUNTIME, format!("cannot read {}: {e}", csv_path.display()))
    })?;
    roster_recon::load_roster(label, &csv_data, roster, ctx)
        .map_err(|e| recon_err(EXIT_RECON_RUNTIME, e.to_string()))
}

fn load_optional(
    base_dir: &Path,
    label: &str,
    roster: Option<&RosterConfig>,
    ctx: &NormalizeContext,
) -> Result<Vec<MemberRecord>, CliError> {
    match roster {
        Some(r) => load_roster(base_dir, label, r, ctx),
        None => Ok(Vec::new()),
    }
}

/// Load every roster the config names, resolving files relative to `base_dir`.
fn load_input(config: &ReconConfig, base_dir: &Path) -> Result<ReconInput, CliError> {
    let ctx = config.normalize_context();
    let carry = &config.carry_over;

    Ok(ReconInput {
        hr: load_optional(base_dir, "hr", config.rosters.hr.as_ref(), &ctx)?,
        insurer: load_roster(base_dir, "insurer", &config.rosters.insurer, &ctx)?,
        internal: load_roster(base_dir, "internal", &config.rosters.internal, &ctx)?,
        slabs: config.slab_table(),
        carry_over: CarryOver {
            add: load_optional(base_dir, "carry_over.add", carry.add.as_ref(), &ctx)?,
            edit: load_optional(base_dir, "carry_over.edit", carry.edit.as_ref(), &ctx)?,
            offboard: load_optional(base_dir, "carry_over.offboard", carry.offboard.as_ref(), &ctx)?,
        },
    })
}

fn cmd_recon_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    fail_on_actions: bool,
) -> Result<(), CliError> {
    let config = read_config(&config_path)?;

    // Resolve file paths relative to config file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let input = load_input(&config, base_dir)?;

    let result = roster_recon::run(&config, &input);

    // Output
    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("JSON serialization error: {e}")))?;

    let output_file = output_file.or_else(|| config.output.json.as_ref().map(|p| base_dir.join(p)));
    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    print_summary(&result);

    if fail_on_actions && result.summary.has_actions() {
        return Err(recon_err(EXIT_RECON_ACTIONS, "members need follow-up"));
    }
    Ok(())
}

/// Human summary to stderr.
fn print_summary(result: &ReconResult) {
    let s = &result.summary;
    eprintln!(
        "{}-way recon '{}' ({}): {} driving records: {} perfect, {} corrections, {} additions, {} offboards",
        result.meta.way,
        result.meta.config_name,
        result.meta.policy_type,
        s.driving_records,
        s.perfect_matches,
        s.corrections,
        s.additions,
        s.offboards,
    );
    for bucket in result.buckets.iter().filter(|b| !b.members.is_empty()) {
        eprintln!("  {:<20} {:>5}  {}", bucket.kind.to_string(), bucket.members.len(), bucket.message);
        if let Some(action) = &bucket.action {
            eprintln!("  {:<20}        {action}", "");
        }
    }
    if !s.unresolved_slabs.is_empty() {
        eprintln!("{} member(s) without a matching slab", s.unresolved_slabs.len());
    }
}

fn cmd_recon_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    let profile = config.profile();
    eprintln!(
        "valid: recon '{}' ({}) with {} roster(s), {} slab(s), {} matching key(s)",
        config.name,
        profile.policy_type,
        config.rosters().len(),
        config.slabs.len(),
        profile.keys.len(),
    );
    Ok(())
}
