//! Prompt templates for MultiversX contract generation.

pub const SYSTEM_PROMPT: &str = r#"You are an expert MultiversX Rust smart contract developer.
Generate production-ready code using multiversx-sc framework v0.64.0.

CRITICAL REQUIREMENTS:
1. Use proper Rust syntax and MultiversX conventions
2. Include comprehensive error handling with require! macros
3. Add storage mappers for all state variables
4. Implement events for important actions
5. Use #[only_owner] for admin functions
6. Add detailed inline comments
7. Follow security best practices (no reentrancy, overflow protection)
8. Use modern #[type_abi] attribute (NOT TypeAbi derive)
9. Use multiversx_sc::imports!() and multiversx_sc::derive_imports!()
10. Events can only have 1 non-indexed data argument (make others indexed)

CODE STRUCTURE:
- Start with #![no_std]
- Use multiversx_sc::imports!() and multiversx_sc::derive_imports!()
- Define contract trait with #[multiversx_sc::contract]
- Include init and upgrade functions
- Add all endpoints with proper attributes
- Define storage mappers
- Add events
- Define structs/enums at the end with #[type_abi]

COMMON PITFALLS TO AVOID:
- DO NOT use TypeAbi derive (deprecated), use #[type_abi] attribute instead
- DO NOT use &self in storage mapper definitions
- DO NOT forget #[storage_mapper("name")] attribute
- DO NOT forget to import types (BigUint, TokenIdentifier, etc.)
- Events MUST have exactly 1 non-indexed data field (use #[indexed] for others)
- Always use ManagedBuffer for strings, not String or &str
- Use Self::Api for generic type parameters in structs
- All endpoints must have proper visibility (#[endpoint], #[view], etc.)

MINIMAL EXAMPLE STRUCTURE:
```rust
#![no_std]

multiversx_sc::imports!();
multiversx_sc::derive_imports!();

#[multiversx_sc::contract]
pub trait YourContract {
    #[init]
    fn init(&self) {}

    #[upgrade]
    fn upgrade(&self) {}

    #[view(getCounter)]
    #[storage_mapper("counter")]
    fn counter(&self) -> SingleValueMapper<u64>;
}
```

OUTPUT: Only the complete Rust code for the contract, no explanations."#;

const FIX_HINTS: &str = r#"COMMON FIXES FOR MULTIVERSX CONTRACTS:
- Replace TypeAbi derive with #[type_abi] attribute
- Ensure storage mappers have #[storage_mapper("name")] and return proper types
- Events must have exactly 1 non-indexed data field (add #[indexed] to others)
- Use ManagedBuffer instead of String/&str
- Use Self::Api for generic type parameters in structs
- Ensure all imports are present (multiversx_sc::imports!(), multiversx_sc::derive_imports!())"#;

/// Prompt for a fresh contract.
pub fn contract_prompt(description: &str, category: &str) -> String {
    format!(
        "{SYSTEM_PROMPT}\n\n\
         Create a MultiversX smart contract with the following requirements:\n\n\
         **Description**: {description}\n\n\
         **Category**: {category}\n\n\
         **Additional Guidelines**:\n\
         - Keep it simple and focused on core functionality\n\
         - Ensure all functions have clear error messages\n\
         - Add view functions for all important state\n\
         - Include proper access control where needed\n\n\
         Generate the complete contract source now:"
    )
}

/// Prompt asking the model to repair compilation errors.
pub fn fix_prompt(source: &str, errors: &str, attempt: u32, max_attempts: u32) -> String {
    format!(
        "You are an expert Rust developer specializing in MultiversX smart contracts.\n\n\
         TASK: Fix the compilation errors in this Rust smart contract code.\n\n\
         COMPILATION ERRORS:\n{errors}\n\n\
         CURRENT CODE:\n```rust\n{source}\n```\n\n\
         INSTRUCTIONS:\n\
         1. Analyze the compilation errors carefully\n\
         2. Fix ONLY the errors, do not modify working code\n\
         3. Maintain the contract's functionality\n\
         4. Use MultiversX SC framework v0.64.0 conventions\n\
         5. Return ONLY the fixed Rust code\n\n\
         {FIX_HINTS}\n\n\
         ATTEMPT: {attempt}/{max_attempts}\n\n\
         Return the complete fixed code:"
    )
}

/// Prompt for scenario tests of a compiled contract.
pub fn tests_prompt(source: &str) -> String {
    format!(
        "Generate comprehensive integration tests for this MultiversX smart contract.\n\n\
         CONTRACT CODE:\n```rust\n{source}\n```\n\n\
         Generate tests using multiversx-sc-scenario framework that:\n\
         1. Test all public endpoints\n\
         2. Test edge cases and error conditions\n\
         3. Test access control\n\
         4. Test state changes\n\n\
         Return ONLY the test code for tests/integration_test.rs:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_prompt_embeds_request() {
        let prompt = contract_prompt("A staking pool with rewards", "staking");
        assert!(prompt.starts_with(SYSTEM_PROMPT));
        assert!(prompt.contains("**Description**: A staking pool with rewards"));
        assert!(prompt.contains("**Category**: staking"));
    }

    #[test]
    fn test_fix_prompt_carries_attempt_and_errors() {
        let prompt = fix_prompt("fn a() {}", "error[E0425]: x", 2, 3);
        assert!(prompt.contains("ATTEMPT: 2/3"));
        assert!(prompt.contains("COMPILATION ERRORS:\nerror[E0425]: x"));
        assert!(prompt.contains("```rust\nfn a() {}\n```"));
    }
}
