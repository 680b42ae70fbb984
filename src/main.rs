use claim_ledger::config::LedgerConfig;
use claim_ledger::constants::{self, NETWORK_NAME};
use claim_ledger::journal::{FileJournal, Journal};
use claim_ledger::model::{FraudAssessment, NewClaim, NewIdentity, NewPolicy, NewTrainingRound, Principal, Role};
use claim_ledger::views::{generate_claim_number, generate_did, generate_policy_number};
use claim_ledger::{api, LedgerResult, LedgerService, Registry};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    constants::print_banner();
    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(|s| s.as_str()).unwrap_or("serve");

    let result = match cmd {
        "serve"  => run_server().await,
        "demo"   => run_demo(),
        "verify" => match args.get(2) {
            Some(path) => run_verify(path),
            None => {
                eprintln!("usage: claim-ledger-node verify <journal>");
                std::process::exit(2);
            }
        },
        _        => {
            print_help();
            Ok(())
        }
    };

    if let Err(e) = result {
        log::error!("❌ {}", e);
        std::process::exit(1);
    }
}

fn print_help() {
    println!("{} — available commands:", NETWORK_NAME);
    println!("  serve             — HTTP node (default; configured via LEDGER_* env vars)");
    println!("  demo              — in-memory claim lifecycle walkthrough");
    println!("  verify <journal>  — replay a journal file and check the chain");
    println!("  help              — this list");
}

// =============================================================================
// SERVE
// =============================================================================

async fn run_server() -> LedgerResult<()> {
    let config = LedgerConfig::from_env();
    let service = LedgerService::open(&config)?;
    let (blocks, counts) = service.read(|r| (r.chain().len(), r.get_total_counts())).await;
    log::info!(
        "🚀 Node {} ready: {} blocks, {} users, {} policies, {} claims",
        config.node_id, blocks, counts.users, counts.policies, counts.claims
    );

    let mut events = service.subscribe().await;
    tokio::spawn(async move {
        while let Ok(env) = events.recv().await {
            log::debug!("📣 #{} {:?}", env.block_index, env.event);
        }
    });

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    log::info!("🌐 HTTP API listening on http://{}/v1", config.listen_addr);
    axum::serve(listener, api::router(service)).await?;
    Ok(())
}

// =============================================================================
// VERIFY
// =============================================================================

fn run_verify(path: &str) -> LedgerResult<()> {
    let journal = FileJournal::open(path)?;
    let blocks = journal.load()?.len();
    println!("Journal: {} ({} blocks)", journal.describe(), blocks);
    let config = LedgerConfig::in_memory().with_journal(path);
    let registry = Registry::open(&config)?;
    let report = registry.verify_chain_report();
    println!("Chain:   {}", report);
    println!("Counts:  {:?}", registry.get_total_counts());
    report.into_result().map(|_| ())
}

// =============================================================================
// DEMO
// =============================================================================

fn run_demo() -> LedgerResult<()> {
    println!("\n=== Claim Lifecycle Demo ===\n");
    let mut reg = Registry::new(&LedgerConfig::in_memory());
    let alice = Principal::new("0xA11CE")?;
    let acme = Principal::new("0xACME")?;
    let hospital = Principal::new("0xC17Y")?;

    reg.register_user(&alice, "alice", Role::Patient, "Alice Patient")?;
    let did = reg.create_identity(&alice, NewIdentity {
        did: generate_did(alice.as_str()),
        name: "Alice Patient".into(),
        email: "alice@example.com".into(),
        id_number: "ID-0001".into(),
        date_of_birth: "1990-04-01".into(),
    })?;
    reg.register_user(&acme, "acme", Role::Insurance, "Acme Insurance")?;
    let policy_number = generate_policy_number();
    let policy_id = reg.create_policy(&acme, NewPolicy {
        policy_number: policy_number.clone(),
        did: did.clone(),
        patient_name: "Alice Patient".into(),
        policy_type: "health".into(),
        coverage_amount: 500_000,
        premium: 1_500,
        duration_months: 12,
        insurance_company: "Acme Insurance".into(),
    })?;
    reg.register_user(&hospital, "cityhosp", Role::Hospital, "City Hospital")?;

    let mut claim = NewClaim {
        claim_number: generate_claim_number(),
        policy_id,
        policy_number: policy_number.clone(),
        did: did.clone(),
        patient_name: "Alice Patient".into(),
        claim_type: "surgery".into(),
        amount: 20_000,
        description: "knee reconstruction".into(),
        hospital_name: "City Hospital".into(),
        diagnosis: "ACL tear".into(),
        assessment: FraudAssessment {
            fraud_score: 18,
            is_fraudulent: false,
            ai_decision: "APPROVED".into(),
            ml_fraud_type: "N/A".into(),
            ml_confidence: 0,
        },
    };
    let first = reg.submit_claim(&hospital, claim.clone())?;
    claim.claim_number = generate_claim_number();
    claim.amount = 95_000;
    claim.assessment = FraudAssessment {
        fraud_score: 91,
        is_fraudulent: true,
        ai_decision: "REJECTED".into(),
        ml_fraud_type: "UPCODING".into(),
        ml_confidence: 87,
    };
    let second = reg.submit_claim(&hospital, claim)?;
    reg.approve_claim(&acme, first)?;
    reg.reject_claim(&acme, second)?;
    reg.record_training_round(&acme, NewTrainingRound {
        global_accuracy: 91,
        nodes_participated: 3,
        total_samples: 4_800,
    })?;

    if let Err(e) = reg.approve_claim(&acme, first) {
        println!("Second approval refused: {}", e);
    }

    println!("\n{:>4}  {:<18} {:<16}  {}", "#", "type", "hash", "previous");
    println!("{}", "─".repeat(60));
    for block in reg.get_chain() {
        println!(
            "{:>4}  {:<18} {}  {}",
            block.index,
            block.block_type.as_str(),
            &block.hash[..16],
            &block.previous_hash[..16]
        );
    }
    println!("\nChain: {}", reg.verify_chain_report());
    println!("{}", reg.analytics(&acme)?);
    Ok(())
}
