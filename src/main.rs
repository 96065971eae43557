use clap::{Arg, Command};
use log::LevelFilter;
use lostfound_report::analysis::analyzer_from_config;
use lostfound_report::config::{self, Config};
use lostfound_report::confirmation::{DISCLAIMERS, NO_IMAGE_TEXT};
use lostfound_report::flow::{INSTRUCTIONS, NOTES_BEFORE_REPORTING};
use lostfound_report::taxonomy::OTHER_SUBCATEGORY;
use lostfound_report::{
    Category, City, DraftEdit, FlowServices, ImageAttachment, ReportFlow, ReportKind, StageKind,
    VerificationEvent,
};
use std::path::Path;
use std::process;

const DEFAULT_CONFIG: &str = "lostfound-report.yaml";

#[tokio::main]
async fn main() {
    let matches = Command::new("lostfound-report")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Lost and found item reporting with identity verification and AI-assisted entry")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path (YAML or TOML)")
                .default_value(DEFAULT_CONFIG),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file (TOML if FILE ends in .toml, else YAML)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Load and validate the configuration, then print a summary")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-categories")
                .long("list-categories")
                .help("List report categories, their subcategories and supported cities")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("analyze-image")
                .long("analyze-image")
                .value_name("FILE")
                .help("Run image analysis on a photo and print the suggested fields")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("mime")
                .long("mime")
                .value_name("TYPE")
                .help("MIME type of the image (guessed from the extension if omitted)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("demo")
                .long("demo")
                .help("Walk through a complete scripted report")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("image")
                .long("image")
                .value_name("FILE")
                .help("Photo to attach and analyze during --demo")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Trace)
        .init();
    log::set_max_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    if matches.get_flag("list-categories") {
        list_categories();
        return;
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG);

    let config = match config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e:#}");
            process::exit(1);
        }
    };
    if !verbose {
        log::set_max_level(config.logging.level_filter());
    }

    if matches.get_flag("test-config") {
        print_config_summary(config_path, &config);
        return;
    }

    let mime = matches.get_one::<String>("mime").map(String::as_str);

    if let Some(image_path) = matches.get_one::<String>("analyze-image") {
        if let Err(e) = analyze_image_file(&config, image_path, mime).await {
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
        return;
    }

    if matches.get_flag("demo") {
        let image = matches.get_one::<String>("image").map(String::as_str);
        if let Err(e) = run_demo(&config, image, mime).await {
            eprintln!("❌ Demo failed: {e:#}");
            process::exit(1);
        }
        return;
    }

    println!("Nothing to do. Try --demo, --list-categories or --help.");
}

fn generate_default_config(path: &str) {
    match config::save(&Config::default(), path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}

fn list_categories() {
    println!("📋 Report Categories");
    println!("═══════════════════════════════════════");
    for category in Category::ALL {
        println!("  {category}");
        for subcategory in category.subcategories() {
            println!("    • {subcategory}");
        }
    }
    println!();
    println!("🏙️  Supported Cities");
    println!("═══════════════════════════════════════");
    for city in City::ALL {
        let marker = if city == City::default() { " (default)" } else { "" };
        println!("  {city}{marker}");
    }
}

fn print_config_summary(path: &str, config: &Config) {
    println!("🔍 Testing configuration: {path}");
    println!();
    let v = &config.verification;
    println!("Verification:");
    println!("  Demo accounts: {}", v.accounts.len());
    match v.max_code_attempts {
        Some(max) => println!("  Code attempts before lockout: {max}"),
        None => println!("  Code attempts before lockout: unlimited"),
    }
    println!("  Minimum password length: {}", v.min_password_length);

    println!("Analysis:");
    match config.analysis.resolve_api_key() {
        Some(_) => println!("  Live analysis with model {}", config.analysis.model),
        None => println!(
            "  Mock analysis ({} not set, {}ms delay)",
            config.analysis.api_key_env, config.analysis.mock_delay_ms
        ),
    }

    println!("Submission:");
    match &config.submission.endpoint {
        Some(endpoint) => println!("  POST {endpoint}"),
        None => println!("  Local (reports are logged, not sent)"),
    }
    println!();
    println!("✅ Configuration is valid");
}

fn guess_mime(path: &str) -> Option<&'static str> {
    let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

fn read_image(path: &str, mime: Option<&str>) -> anyhow::Result<ImageAttachment> {
    use anyhow::Context;

    let mime = mime
        .or_else(|| guess_mime(path))
        .with_context(|| format!("Cannot tell the image type of {path}, pass --mime"))?;
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read image: {path}"))?;
    let mut image = ImageAttachment::new(bytes, mime)?;
    if let Some(name) = Path::new(path).file_name().and_then(|n| n.to_str()) {
        image = image.with_file_name(name);
    }
    Ok(image)
}

async fn analyze_image_file(
    config: &Config,
    path: &str,
    mime: Option<&str>,
) -> anyhow::Result<()> {
    let image = read_image(path, mime)?;
    let analyzer = analyzer_from_config(&config.analysis);
    println!("🔎 Analyzing {path} with the {} analyzer...", analyzer.name());

    let suggestion = analyzer.analyze(image.bytes(), image.mime_type()).await?;
    println!("{}", serde_json::to_string_pretty(&suggestion)?);
    Ok(())
}

async fn run_demo(config: &Config, image: Option<&str>, mime: Option<&str>) -> anyhow::Result<()> {
    let services = FlowServices::from_config(config)?;
    let mut flow = ReportFlow::new(services, false);

    println!("🔐 Identity verification");
    let password = format!(
        "demo-{}",
        "7".repeat(config.verification.min_password_length)
    );
    let events = [
        VerificationEvent::SubmitEmail("citizen@example.in".to_string()),
        VerificationEvent::SubmitEmailCode(config.verification.email_code.clone()),
        VerificationEvent::SubmitMobile("9876543210".to_string()),
        VerificationEvent::SubmitMobileCode(config.verification.mobile_code.clone()),
        VerificationEvent::SubmitPassword {
            password: password.clone(),
            confirmation: password,
        },
    ];
    for event in events {
        if flow.stage_kind() != StageKind::Authenticate {
            break;
        }
        let stage = flow.verify(event)?;
        if let Some(session) = flow.verification() {
            println!("  → {:?}", session.stage());
        } else {
            println!("  → {stage:?}");
        }
    }

    println!();
    println!("📖 Instructions");
    for line in INSTRUCTIONS {
        println!("  • {line}");
    }
    println!("⚠️  Note Before Reporting");
    for line in NOTES_BEFORE_REPORTING {
        println!("  • {line}");
    }
    flow.acknowledge_instructions(true)?;

    println!();
    println!("📝 Report form");
    for edit in [
        DraftEdit::Kind(ReportKind::Lost),
        DraftEdit::Category(Some(Category::Electronics)),
        DraftEdit::Subcategory("Mobile Phone".to_string()),
        DraftEdit::Title("Black smartphone".to_string()),
        DraftEdit::Description("Black phone in a transparent cover".to_string()),
        DraftEdit::Location("Near Ram Ghat".to_string()),
        DraftEdit::City(City::Ujjain),
        DraftEdit::Tags("phone, black".to_string()),
    ] {
        flow.edit(edit)?;
    }

    if let Some(path) = image {
        flow.edit(DraftEdit::AttachImage(read_image(path, mime)?))?;
        println!("  Analyzing attached image...");
        match flow.analyze_image().await {
            Ok(outcome) => println!("  Analysis {outcome:?}"),
            Err(e) => println!("  ⚠️  {e}, continuing with manual entry"),
        }
    }

    // A free-text suggestion may not be one of the listed subcategories
    let listed = flow
        .draft()
        .and_then(|d| d.category().map(|c| c.permits(d.subcategory())))
        .unwrap_or(false);
    if !listed {
        flow.edit(DraftEdit::Subcategory(OTHER_SUBCATEGORY.to_string()))?;
    }
    flow.submit_form()?;

    println!();
    println!("✅ Confirm details");
    if let Some(confirmation) = flow.confirmation() {
        for row in confirmation.rows() {
            println!("  {:<14} {}", row.label, row.value);
        }
        if !confirmation.has_image() {
            println!("  {NO_IMAGE_TEXT}");
        }
    }

    let report = flow.confirm().await?;
    println!();
    println!("🎉 Report {} submitted", report.id());
    println!("{}", report.message());
    println!();
    println!("Note after form Submission");
    for notice in report.notices() {
        println!("  • {notice}");
    }
    println!("Disclaimer");
    for line in DISCLAIMERS {
        println!("  • {line}");
    }
    Ok(())
}
