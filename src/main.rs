//! Preview binary - simulates one page load and prints the result
//!
//! Usage:
//!   cargo run -- [PATH] [BROWSER_LANGUAGE]
//!   cargo run -- /zh/ en-US
//!   cargo run -- / zh-CN --reduced-motion
//!
//! Optional environment variables:
//! - SITE_STORE_PATH (persist the locale preference between runs)
//! - SITE_CATALOG_PATH (defaults to the built-in catalog)
//! - SITE_PUBLISHED_LOCALES (defaults to "en,zh")
//! - SITE_REDUCED_MOTION, SITE_TYPEWRITER_STAGGER, SITE_TYPING_MS_LATIN,
//!   SITE_TYPING_MS_ZH, SITE_RIPPLE_MS, SITE_REVEAL_STAGGER_MS

use anyhow::{bail, Context, Result};
use markdownflow_site::config::Config;
use markdownflow_site::diagram::SourceRenderer;
use markdownflow_site::dom::skeleton;
use markdownflow_site::i18n::CatalogValidator;
use markdownflow_site::page::{self, BootOutcome, PageContext, PageEnv, RecordingNavigator};
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;
use tokio::time::sleep;
use tracing::{info, warn};

/// Time allowed for the typewriter and skeleton timers to finish.
const SETTLE_TIME: Duration = Duration::from_secs(4);

/// Pause between simulated scroll steps.
const SCROLL_STEP_PAUSE: Duration = Duration::from_millis(200);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("markdownflow_site=info".parse()?),
        )
        .init();

    // Parse CLI arguments
    let args: Vec<String> = std::env::args().skip(1).collect();
    let reduced_motion_flag = args.iter().any(|arg| arg == "--reduced-motion");
    let mut positional = args.iter().filter(|arg| !arg.starts_with("--"));
    let path = positional.next().cloned().unwrap_or_else(|| "/".to_string());
    let browser_language = positional.next().cloned();

    let config = Config::from_env()?;
    let catalog = config.load_catalog()?;

    let validation = CatalogValidator::validate(&catalog);
    for warning in &validation.warnings {
        warn!("Catalog: {}", warning);
    }
    if validation.has_errors() {
        bail!("Catalog is invalid: {}", validation.errors.join("; "));
    }

    let navigator = RecordingNavigator::default();
    let ctx = PageContext::new(catalog, config.open_store(), Rc::new(navigator.clone()))
        .with_resolver(config.resolver())
        .with_animation(config.animation());

    let mut env = PageEnv::new(&path).with_reduced_motion(reduced_motion_flag);
    env.browser_language = browser_language;

    info!("Loading {} (browser language: {:?})", env.path, env.browser_language);

    let local = LocalSet::new();
    local
        .run_until(async move {
            let doc = skeleton::landing_page().into_shared();
            let mut session = match page::boot(&ctx, &env, doc.clone()) {
                BootOutcome::Redirected(decision) => {
                    println!("\n========== REDIRECT ==========");
                    println!("{}", serde_json::to_string_pretty(&decision)?);
                    println!("Navigations: {:?}", navigator.visits());
                    println!("==============================\n");
                    return Ok(());
                }
                BootOutcome::Running(session) => session,
            };
            session.attach_diagrams(Rc::new(SourceRenderer::default()));

            // Scroll through the page so every reveal target is seen
            let (page_height, viewport_height) = {
                let d = doc.borrow();
                let height = d.rect(d.body()).map(|rect| rect.bottom()).unwrap_or(0.0);
                (height, d.viewport().height)
            };
            let mut scroll_y = 0.0;
            while scroll_y < page_height {
                scroll_y += viewport_height / 2.0;
                doc.borrow_mut().scroll_to(scroll_y);
                sleep(SCROLL_STEP_PAUSE).await;
            }
            sleep(SETTLE_TIME).await;

            println!("\n========== DECISION ==========");
            println!("{}", serde_json::to_string_pretty(session.decision())?);
            println!("\n========== HYDRATION ==========");
            println!("{}", serde_json::to_string_pretty(session.report())?);
            println!("\n========== DOCUMENT ==========");
            println!("{}", doc.borrow().to_html());
            println!("==============================\n");

            let revoked = session.teardown();
            info!("Preview finished ({} registrations revoked)", revoked);
            Ok::<(), anyhow::Error>(())
        })
        .await
        .context("Preview failed")
}
