use crate::infra::{InMemoryCredentialService, InMemoryScoreRepository};
use chrono::Utc;
use clap::Args;
use growth_score::config::ScoringSettings;
use growth_score::error::AppError;
use growth_score::scoring::keys::{organization_key, record_key};
use growth_score::scoring::{
    BulkScoreUpdate, CategoryScore, Identity, OrganizationConfig, OrganizationDraft,
    Registration, ScoreEngine, ScoreOverrides, ScoreRecord, ScoreSubmission,
};
use std::sync::Arc;

const DEMO_WEIGHTS: [u32; 10] = [4, 1, 1, 1, 1, 2, 1, 1, 1, 1];

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Display name of the demo applicant
    #[arg(long, default_value = "Ada Lovelace")]
    pub(crate) name: String,
    /// Cooldown between non-forced score updates, in seconds
    #[arg(long, default_value_t = 60)]
    pub(crate) cooldown: u64,
    /// Print the final record as JSON after the walkthrough
    #[arg(long)]
    pub(crate) json: bool,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            name: "Ada Lovelace".to_string(),
            cooldown: 60,
            json: false,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct KeysArgs {
    /// Program namespace the keys are derived under
    #[arg(long, default_value = "growth")]
    pub(crate) namespace: String,
    /// Mint identity the organization was created with
    #[arg(long)]
    pub(crate) mint: String,
    /// Authority identity that created the organization
    #[arg(long)]
    pub(crate) authority: String,
    /// Applicant identity; prints the score record key as well
    #[arg(long)]
    pub(crate) applicant: Option<String>,
}

pub(crate) fn run_keys(args: KeysArgs) -> Result<(), AppError> {
    let KeysArgs {
        namespace,
        mint,
        authority,
        applicant,
    } = args;

    let organization = organization_key(
        &namespace,
        &Identity::new(mint),
        &Identity::new(authority),
    );
    println!("organization: {organization}");
    if let Some(applicant) = applicant {
        let record = record_key(&namespace, &organization, &Identity::new(applicant));
        println!("record:       {record}");
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let credentials = Arc::new(InMemoryCredentialService::default());
    let engine = ScoreEngine::new(
        Arc::new(InMemoryScoreRepository::default()),
        credentials.clone(),
        ScoringSettings::default(),
    );

    let authority = Identity::new("demo-authority");
    let applicant = Identity::new("demo-applicant");
    // reviews are back-dated one cooldown apart so the walkthrough needs no waiting
    let now = Utc::now().timestamp();
    let step = i64::try_from(args.cooldown).unwrap_or(i64::MAX);
    let started = now.saturating_sub(step.saturating_mul(2));

    println!("Growth score demo");
    let org = engine.create_organization(&authority, demo_draft(args.cooldown))?;
    render_organization(&org);

    engine.register(
        &authority,
        &org.key,
        Registration {
            applicant: applicant.clone(),
            name: args.name.clone(),
            flags: Vec::new(),
            timestamp: started,
        },
    )?;
    let record = engine.verify(&authority, &org.key, &applicant)?;
    render_step("registered and verified", &record);

    let record = engine.receive_score(
        &authority,
        &org.key,
        &applicant,
        ScoreSubmission {
            scores: vec![CategoryScore::Set(10); DEMO_WEIGHTS.len()],
            timestamp: Some(started.saturating_add(step)),
        },
    )?;
    render_step("first review", &record);

    let record = engine.receive_score(
        &authority,
        &org.key,
        &applicant,
        ScoreSubmission {
            scores: [40, 50, 50, 55, 55, 59, 50, 50, 55, 50]
                .into_iter()
                .map(CategoryScore::Set)
                .collect(),
            timestamp: Some(started.saturating_add(step.saturating_mul(2))),
        },
    )?;
    render_step("second review", &record);

    let record = engine.send_score(&authority, &org.key, &applicant)?;
    render_step("score sent", &record);
    render_credential(&credentials, &record);

    let mut correction = vec![CategoryScore::Unset; DEMO_WEIGHTS.len()];
    correction[0] = CategoryScore::Set(100);
    correction[1] = CategoryScore::Set(100);
    engine.update_scores(
        &authority,
        &org.key,
        &applicant,
        BulkScoreUpdate {
            scores: correction,
            timestamp: started.saturating_add(step.saturating_mul(2)),
            overrides: ScoreOverrides::default(),
            force: true,
        },
    )?;
    let record = engine.send_score(&authority, &org.key, &applicant)?;
    render_step("forced correction sent", &record);
    render_credential(&credentials, &record);

    if args.json {
        match serde_json::to_string_pretty(&record.status_view()) {
            Ok(json) => println!("\nFinal status payload:\n{json}"),
            Err(err) => println!("\nFinal status payload unavailable: {err}"),
        }
    }

    Ok(())
}

fn demo_draft(cooldown_seconds: u64) -> OrganizationDraft {
    OrganizationDraft {
        name: "Designity".to_string(),
        mint: Identity::new("demo-mint"),
        category_count: DEMO_WEIGHTS.len(),
        category_weights: DEMO_WEIGHTS.to_vec(),
        breakpoint_sets: vec![vec![25, 50, 75], vec![25, 75]],
        level_groups: vec![vec![0, 1, 2, 3], vec![0, 1, 2]],
        category_groups: Vec::new(),
        public_uri: "https://public.designity.software".to_string(),
        cooldown_seconds,
        min_scored_categories: 1,
    }
}

fn render_organization(org: &OrganizationConfig) {
    println!("Organization: {} ({})", org.name, org.key);
    println!("  Authority: {}", org.authority);
    println!(
        "  Weights: {:?} | cooldown {}s",
        org.category_weights, org.cooldown_seconds
    );
    for (index, (breakpoints, levels)) in org
        .breakpoint_sets
        .iter()
        .zip(&org.level_groups)
        .enumerate()
    {
        println!("  Level set {index}: breakpoints {breakpoints:?} -> levels {levels:?}");
    }
}

fn render_step(label: &str, record: &ScoreRecord) {
    println!(
        "\n{label}: status={} aggregate={} level={} levels={:?} scored={}/{}",
        record.status,
        record.aggregate,
        record.level,
        record.set_levels,
        record.scored_categories(),
        record.raw_scores.len()
    );
}

fn render_credential(credentials: &InMemoryCredentialService, record: &ScoreRecord) {
    match credentials.token(&record.credential) {
        Some(token) => {
            println!(
                "  Credential {} ({}) -> {}",
                record.credential, token.metadata.name, token.metadata.uri
            );
            println!(
                "  Owner: {} | collection verified: {}",
                token.owner, token.collection_verified
            );
        }
        None => println!("  Credential {} not found in ledger", record.credential),
    }
}
