use clap::Parser;
use pod_bulk::core::ProductApi;
use pod_bulk::domain::model::Template;
use pod_bulk::utils::{logger, validation};
use pod_bulk::PodApiClient;

#[derive(Parser)]
#[command(name = "list-templates")]
#[command(about = "List print templates with their variants and print areas")]
struct Args {
    #[arg(long)]
    api_endpoint: String,

    #[arg(long)]
    api_key: String,

    #[arg(long)]
    gateway_key: Option<String>,

    /// Show a single template with its placeholders
    #[arg(long)]
    template_id: Option<String>,

    /// Print raw JSON instead of a listing
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    if let Err(e) = validation::validate_url("api_endpoint", &args.api_endpoint) {
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    let result = match PodApiClient::new(
        &args.api_endpoint,
        &args.api_key,
        args.gateway_key.as_deref(),
    ) {
        Ok(client) => match &args.template_id {
            Some(id) => client.fetch_template(id).await.map(|t| vec![t]),
            None => client.list_templates().await,
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(templates) if args.json => match serde_json::to_string_pretty(&templates) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
        },
        Ok(templates) => {
            for template in &templates {
                print_template(template, args.template_id.is_some());
            }
            println!("{} templates", templates.len());
        }
        Err(e) => {
            tracing::error!("❌ Listing templates failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    }
}

fn print_template(template: &Template, with_placeholders: bool) {
    println!("📦 {} ({}) - {} variants", template.name, template.id, template.variants.len());
    for variant in &template.variants {
        println!("  • {} ({})", variant.name, variant.id);
        if !with_placeholders {
            continue;
        }
        for placeholder in &variant.placeholders {
            match placeholder.print_area() {
                Some(area) => println!("      {} {}", placeholder.name, area),
                None => println!("      {} (any size)", placeholder.name),
            }
        }
    }
}
