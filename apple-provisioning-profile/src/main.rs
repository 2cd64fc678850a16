// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    apple_provisioning_profile::{
        default_profiles_directory, scan_directory, AppleProfileError, MemoryTrustStore,
        ProfileHealth, ProfileReport, ProvisioningProfile, Severity,
    },
    chrono::{DateTime, Utc},
    clap::{Arg, ArgMatches, Command},
    log::{debug, warn, LevelFilter},
    std::path::{Path, PathBuf},
};

#[cfg(target_os = "macos")]
use apple_provisioning_profile::{keychain_trust_store, KeychainDomain};

const LIST_ABOUT: &str = "\
Decode every provisioning profile in a directory and report on its health.

By default, the directory Xcode installs profiles into is scanned
(~/Library/MobileDevice/Provisioning Profiles). Files that fail to decode
are reported as warnings and do not stop the scan.

Each profile is printed on a single line with its severity, expiration
date, UUID, name, team and the most important issue, if any.
";

const SHOW_ABOUT: &str = "\
Decode a single provisioning profile and print its content.

All decoded fields are printed, along with the status of the CMS signature
and the health of every embedded developer certificate.
";

const TRUST_STORE_ABOUT: &str = "\
Certificate health is evaluated against a trust store of installed
certificates and signing identities (certificates with an available
private key).

On macOS, the user keychain is consulted unless other sources are given.
Use --keychain-domain to select a different keychain.

--certificate-pem registers certificates from PEM files as installed.
--identity-pem registers certificates from PEM files containing both a
certificate and a private key as signing identities.
";

fn add_trust_store_args(app: Command) -> Command {
    app.after_help(TRUST_STORE_ABOUT)
        .arg(
            Arg::new("keychain_domain")
                .long("keychain-domain")
                .takes_value(true)
                .possible_values(&["user", "system", "common", "dynamic"])
                .help("(macOS only) Keychain domain to read certificates and identities from"),
        )
        .arg(
            Arg::new("keychain_password")
                .long("keychain-password")
                .takes_value(true)
                .requires("keychain_domain")
                .help("(macOS only) Password to unlock the keychain with"),
        )
        .arg(
            Arg::new("certificate_pem")
                .long("certificate-pem")
                .takes_value(true)
                .multiple_occurrences(true)
                .number_of_values(1)
                .allow_invalid_utf8(true)
                .help("Path to a PEM file of certificates to treat as installed"),
        )
        .arg(
            Arg::new("identity_pem")
                .long("identity-pem")
                .takes_value(true)
                .multiple_occurrences(true)
                .number_of_values(1)
                .allow_invalid_utf8(true)
                .help("Path to a PEM file holding a certificate and its private key"),
        )
        .arg(
            Arg::new("now")
                .long("now")
                .takes_value(true)
                .help("RFC 3339 timestamp to evaluate health at instead of the current time"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print results as JSON"),
        )
}

fn evaluation_time(args: &ArgMatches) -> Result<DateTime<Utc>, AppleProfileError> {
    if let Some(value) = args.value_of("now") {
        Ok(DateTime::parse_from_rfc3339(value)
            .map_err(|e| {
                AppleProfileError::CliGeneralError(format!("invalid --now value {}: {}", value, e))
            })?
            .with_timezone(&Utc))
    } else {
        Ok(Utc::now())
    }
}

#[cfg(target_os = "macos")]
fn keychain_store(
    args: &ArgMatches,
    have_pem_sources: bool,
) -> Result<MemoryTrustStore, AppleProfileError> {
    let domain = match args.value_of("keychain_domain") {
        Some(domain) => {
            KeychainDomain::try_from(domain).map_err(AppleProfileError::CliGeneralError)?
        }
        None if have_pem_sources => return Ok(MemoryTrustStore::default()),
        None => KeychainDomain::User,
    };

    keychain_trust_store(domain, args.value_of("keychain_password"))
}

#[cfg(not(target_os = "macos"))]
fn keychain_store(
    args: &ArgMatches,
    _have_pem_sources: bool,
) -> Result<MemoryTrustStore, AppleProfileError> {
    if args.is_present("keychain_domain") {
        Err(AppleProfileError::CliGeneralError(
            "macOS Keychain integration only supported on macOS".to_string(),
        ))
    } else {
        Ok(MemoryTrustStore::default())
    }
}

fn trust_store_from_args(args: &ArgMatches) -> Result<MemoryTrustStore, AppleProfileError> {
    let have_pem_sources = args.is_present("certificate_pem") || args.is_present("identity_pem");

    let mut store = keychain_store(args, have_pem_sources)?;

    if let Some(paths) = args.values_of_os("certificate_pem") {
        for path in paths {
            store.add_certificates_pem(path)?;
        }
    }

    if let Some(paths) = args.values_of_os("identity_pem") {
        for path in paths {
            store.add_identities_pem(path)?;
        }
    }

    debug!(
        "trust store has {} certificates and {} identities",
        store.certificates().len(),
        store.identities().len()
    );

    Ok(store)
}

fn print_profile_line(profile: &ProvisioningProfile, health: &ProfileHealth, now: DateTime<Utc>) {
    let issue = health.issue(profile, now);
    let severity = Severity::classify(profile, issue, now);

    let mut line = format!(
        "{:<7} {} {} {} ({})",
        severity.as_str(),
        profile.expiration_date_string(),
        profile.uuid,
        profile.name,
        profile.team_name
    );
    if let Some(issue) = issue {
        line.push_str(&format!(": {}", issue));
    }

    println!("{}", line);
}

fn print_profile_details(
    path: &Path,
    profile: &ProvisioningProfile,
    health: &ProfileHealth,
    now: DateTime<Utc>,
) -> Result<(), AppleProfileError> {
    println!("Path:                      {}", path.display());
    println!("UUID:                      {}", profile.uuid);
    println!("Name:                      {}", profile.name);
    println!("App ID Name:               {}", profile.app_id_name);
    if let Some(app_id) = profile.application_identifier() {
        println!("Application Identifier:    {}", app_id);
    }
    println!("Team Name:                 {}", profile.team_name);
    println!(
        "Team Identifiers:          {}",
        profile.team_identifiers.join(", ")
    );
    println!("Platforms:                 {}", profile.platforms.join(", "));
    println!("Creation Date:             {}", profile.creation_date.to_rfc3339());
    println!(
        "Expiration Date:           {}",
        profile.expiration_date.to_rfc3339()
    );
    println!("Time To Live (days):       {}", profile.time_to_live);
    println!("Version:                   {}", profile.version);
    println!("Xcode Managed:             {}", profile.is_xcode_managed);
    println!("Provisions All Devices:    {}", profile.provisions_all_devices);
    match &profile.provisioned_devices {
        Some(devices) => {
            println!("Provisioned Devices:       {}", devices.len());
            for device in devices {
                println!("  - {}", device);
            }
        }
        None => println!("Provisioned Devices:       (not device scoped)"),
    }
    println!("Signature:                 {}", profile.signature);

    let issue = health.issue(profile, now);
    println!(
        "Issue:                     {}",
        issue.map(|i| i.to_string()).unwrap_or_else(|| "none".into())
    );
    println!(
        "Severity:                  {}",
        Severity::classify(profile, issue, now).as_str()
    );

    println!("Developer Certificates:    {}", profile.certificates.len());
    for (i, (cert, cert_health)) in profile
        .certificates
        .iter()
        .zip(health.certificates.iter())
        .enumerate()
    {
        println!("# Certificate {}", i);
        if !cert.is_parseable() {
            println!(
                "  (unparseable; {} bytes of data)",
                cert.raw_data().len()
            );
        } else {
            println!(
                "  Subject CN:              {}",
                cert.subject_common_name().unwrap_or_default()
            );
            println!(
                "  Issuer CN:               {}",
                cert.issuer_common_name().unwrap_or_default()
            );
            println!(
                "  Serial Number:           {}",
                cert.serial_number_hex().unwrap_or_default()
            );
            if let Some(fingerprint) = cert.sha256_fingerprint()? {
                println!("  Fingerprint (SHA-256):   {}", fingerprint);
            }
            if let (Some(not_before), Some(not_after)) =
                (cert.not_valid_before(), cert.not_valid_after())
            {
                println!("  Not Valid Before:        {}", not_before.to_rfc3339());
                println!("  Not Valid After:         {}", not_after.to_rfc3339());
            }
        }
        println!("  Missing:                 {}", cert_health.is_missing);
        println!("  Invalid:                 {}", cert_health.is_invalid);
        println!("  Expired:                 {}", cert_health.is_expired);
        println!(
            "  Missing Private Key:     {}",
            cert_health.is_missing_private_key
        );
    }

    Ok(())
}

fn command_list(args: &ArgMatches) -> Result<(), AppleProfileError> {
    let directory = if let Some(path) = args.value_of_os("directory") {
        PathBuf::from(path)
    } else {
        default_profiles_directory().ok_or_else(|| {
            AppleProfileError::CliGeneralError(
                "unable to resolve home directory; use --directory".to_string(),
            )
        })?
    };

    let now = evaluation_time(args)?;
    let store = trust_store_from_args(args)?;

    debug!("scanning {}", directory.display());
    let results = scan_directory(&directory)?;

    for (path, e) in &results.failures {
        warn!("failed to load {}: {}", path.display(), e);
    }

    if args.is_present("json") {
        let reports = results
            .profiles
            .iter()
            .map(|(path, profile)| {
                let health = ProfileHealth::evaluate(profile, &store, now);
                ProfileReport::new(Some(path.as_path()), profile, &health, now)
            })
            .collect::<Result<Vec<_>, AppleProfileError>>()?;

        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for (_, profile) in &results.profiles {
            let health = ProfileHealth::evaluate(profile, &store, now);
            print_profile_line(profile, &health, now);
        }
    }

    debug!(
        "{} profiles loaded; {} failures",
        results.profiles.len(),
        results.failures.len()
    );

    Ok(())
}

fn command_show(args: &ArgMatches) -> Result<(), AppleProfileError> {
    let path = PathBuf::from(
        args.value_of_os("path")
            .ok_or(AppleProfileError::CliBadArgument)?,
    );

    let now = evaluation_time(args)?;
    let store = trust_store_from_args(args)?;

    let profile = ProvisioningProfile::from_path(&path)?;
    let health = ProfileHealth::evaluate(&profile, &store, now);

    if args.is_present("json") {
        let report = ProfileReport::new(Some(path.as_path()), &profile, &health, now)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_profile_details(&path, &profile, &health, now)?;
    }

    Ok(())
}

fn log_level_for_verbosity(occurrences: u64) -> LevelFilter {
    match occurrences {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main_impl() -> Result<(), AppleProfileError> {
    let app = Command::new("Apple provisioning profile inspector")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Gregory Szorc <gregory.szorc@gmail.com>")
        .about("Inspect Apple provisioning profiles and the health of their certificates")
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .multiple_occurrences(true)
                .help("Increase logging verbosity. Can be specified multiple times."),
        );

    let app = app.subcommand(add_trust_store_args(
        Command::new("list")
            .about("List provisioning profiles in a directory")
            .long_about(LIST_ABOUT)
            .arg(
                Arg::new("directory")
                    .long("directory")
                    .takes_value(true)
                    .allow_invalid_utf8(true)
                    .help("Directory to scan for provisioning profiles"),
            ),
    ));

    let app = app.subcommand(add_trust_store_args(
        Command::new("show")
            .about("Print the content and health of a provisioning profile")
            .long_about(SHOW_ABOUT)
            .arg(
                Arg::new("path")
                    .required(true)
                    .allow_invalid_utf8(true)
                    .help("Path to provisioning profile to examine"),
            ),
    ));

    let matches = app.get_matches();

    let log_level = log_level_for_verbosity(matches.occurrences_of("verbose"));

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    // Disable log context except at higher log levels.
    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
    }

    builder.init();

    match matches.subcommand() {
        Some(("list", args)) => command_list(args),
        Some(("show", args)) => command_show(args),
        _ => Err(AppleProfileError::CliUnknownCommand),
    }
}

fn main() {
    let exit_code = match main_impl() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {}", err);
            1
        }
    };

    std::process::exit(exit_code)
}
