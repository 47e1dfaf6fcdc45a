//! Mock code generator for testing and offline demos.
//!
//! Emits the same progress events a model-backed generator would, on a fixed
//! synthetic delay schedule, and returns a deterministic contract.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use forge_core::{GenerationRequest, ProgressEmitter};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{GenerationError, GenerationResult};
use crate::generator::CodeGenerator;

/// Delay schedule between the mock's status updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockDelays {
    pub analyze: Duration,
    pub structure: Duration,
    pub write: Duration,
    pub finish: Duration,
}

impl Default for MockDelays {
    fn default() -> Self {
        Self {
            analyze: Duration::from_millis(1000),
            structure: Duration::from_millis(800),
            write: Duration::from_millis(1000),
            finish: Duration::from_millis(500),
        }
    }
}

impl MockDelays {
    /// No waiting at all.
    pub fn none() -> Self {
        Self {
            analyze: Duration::ZERO,
            structure: Duration::ZERO,
            write: Duration::ZERO,
            finish: Duration::ZERO,
        }
    }

    /// The default schedule multiplied by `factor`.
    pub fn scaled(factor: f64) -> Self {
        let base = Self::default();
        let scale = |d: Duration| d.mul_f64(factor.max(0.0));
        Self {
            analyze: scale(base.analyze),
            structure: scale(base.structure),
            write: scale(base.write),
            finish: scale(base.finish),
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Recorded `fix` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFix {
    pub source: String,
    pub errors: String,
    pub attempt: u32,
}

/// Deterministic generator with no network access.
#[derive(Clone)]
pub struct MockCodeGenerator {
    delays: MockDelays,
    generate_failure: Arc<RwLock<Option<String>>>,
    fix_failure: Arc<RwLock<Option<String>>>,
    fix_calls: Arc<RwLock<Vec<CapturedFix>>>,
}

impl Default for MockCodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCodeGenerator {
    pub fn new() -> Self {
        Self {
            delays: MockDelays::default(),
            generate_failure: Arc::new(RwLock::new(None)),
            fix_failure: Arc::new(RwLock::new(None)),
            fix_calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_delays(mut self, delays: MockDelays) -> Self {
        self.delays = delays;
        self
    }

    /// Make `generate` fail with a transport error.
    pub fn fail_generate(self, message: impl Into<String>) -> Self {
        *self.generate_failure.write() = Some(message.into());
        self
    }

    /// Make `fix` fail with a transport error.
    pub fn fail_fix(self, message: impl Into<String>) -> Self {
        *self.fix_failure.write() = Some(message.into());
        self
    }

    pub fn fix_calls(&self) -> Vec<CapturedFix> {
        self.fix_calls.read().clone()
    }

    /// The contract the mock returns for `category`.
    pub fn contract_for(description: &str, category: &str) -> String {
        MOCK_CONTRACT
            .replace("{category}", category)
            .replace("{description}", &description.replace('\n', " "))
            .replace("{name}", &pascal_case(category))
    }
}

/// `"defi lending"` → `"DefiLending"`; falls back to `"Generated"`.
fn pascal_case(text: &str) -> String {
    let name: String = text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect();

    match name.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => name,
        Some(_) => format!("Generated{}", name),
        None => "Generated".to_string(),
    }
}

#[async_trait]
impl CodeGenerator for MockCodeGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        progress: &ProgressEmitter,
    ) -> GenerationResult<String> {
        progress.terminal("> Starting simulated code generation...\n", false);

        pause(self.delays.analyze).await;
        let failure = self.generate_failure.read().clone();
        if let Some(msg) = failure {
            return Err(GenerationError::Transport(msg));
        }
        progress.status("Analyzing requirements...", Some(10));

        pause(self.delays.structure).await;
        progress.status("Generating contract structure...", Some(30));

        pause(self.delays.write).await;
        progress.status("Writing smart contract code...", Some(50));
        let code = Self::contract_for(&request.description, &request.category);

        pause(self.delays.finish).await;
        progress.status("Code generation complete!", Some(100));

        debug!("Mock generated {} bytes for {}", code.len(), request.session_id);
        Ok(code)
    }

    async fn fix(
        &self,
        source: &str,
        errors: &str,
        attempt: u32,
        max_attempts: u32,
    ) -> GenerationResult<String> {
        self.fix_calls.write().push(CapturedFix {
            source: source.to_string(),
            errors: errors.to_string(),
            attempt,
        });

        let failure = self.fix_failure.read().clone();
        if let Some(msg) = failure {
            return Err(GenerationError::Transport(msg));
        }

        let first_error = errors.lines().next().unwrap_or("unknown error");
        Ok(format!(
            "// fix {}/{}: {}\n{}",
            attempt, max_attempts, first_error, source
        ))
    }

    async fn generate_tests(&self, _source: &str) -> GenerationResult<String> {
        Ok(MOCK_TESTS.to_string())
    }
}

const MOCK_CONTRACT: &str = r#"#![no_std]

multiversx_sc::imports!();

/// {category} Smart Contract
///
/// Description: {description}
#[multiversx_sc::contract]
pub trait {name}Contract {
    #[init]
    fn init(&self) {}

    #[upgrade]
    fn upgrade(&self) {}

    /// Main contract function
    #[endpoint]
    fn execute(&self, amount: BigUint) {
        let caller = self.blockchain().get_caller();
        require!(amount > 0u64, "Amount must be positive");

        self.process_transaction(&caller, &amount);
        self.transaction_executed_event(&caller, &amount);
    }

    /// Get contract status
    #[view(getStatus)]
    fn get_status(&self) -> bool {
        true
    }

    #[storage_mapper("transactions")]
    fn transactions(&self) -> MapMapper<ManagedAddress, BigUint>;

    #[event("transactionExecuted")]
    fn transaction_executed_event(&self, #[indexed] caller: &ManagedAddress, amount: &BigUint);

    fn process_transaction(&self, caller: &ManagedAddress, amount: &BigUint) {
        let current = self.transactions().get(caller).unwrap_or_default();
        self.transactions().insert(caller.clone(), current + amount);
    }
}
"#;

const MOCK_TESTS: &str = r#"use multiversx_sc_scenario::*;

fn world() -> ScenarioWorld {
    let mut blockchain = ScenarioWorld::new();
    blockchain.register_contract("file:output/contract.wasm", contract::ContractBuilder);
    blockchain
}

#[test]
fn test_init() {
    let mut world = world();
    world.start_trace();

    world.account("owner").nonce(1);
    world
        .tx()
        .from("owner")
        .typed(contract_proxy::ContractProxy)
        .init()
        .code("file:output/contract.wasm")
        .run();
}

#[test]
fn test_execute() {
    let mut world = world();

    world
        .tx()
        .from("user")
        .to("contract")
        .typed(contract_proxy::ContractProxy)
        .execute(100u64)
        .run();
}
"#;
