//! Sample modules registered with the stock `suiterun` binary
//!
//! Suites are linked in, not loaded, so a project that wants its own suites
//! builds a binary around [`crate::main_with`] and its own registry. The
//! stock binary ships these two modules so the runner can be tried against
//! any file named `sample_tests` or `broken_tests`.

use std::collections::VecDeque;
use suiterun_core::{ensure, ensure_eq, fail, Member, StaticIntrospector, Suite, TestModule};

/// Module whose suites all pass
pub const SAMPLE_MODULE: &str = "sample_tests";

/// Module with failing suites
pub const BROKEN_MODULE: &str = "broken_tests";

#[derive(Default)]
struct Arithmetic {
    operands: Vec<i64>,
}

#[derive(Default)]
struct Queue {
    items: VecDeque<String>,
}

struct Ledger {
    balance: i64,
}

/// Registry holding the sample modules
pub fn registry() -> StaticIntrospector {
    StaticIntrospector::new()
        .with(sample_module())
        .with(broken_module())
}

fn sample_module() -> TestModule {
    let arithmetic = Suite::<Arithmetic>::with_default("ArithmeticTests")
        .initialize("Setup", |a| {
            a.operands = vec![2, 3, 5];
            Ok(())
        })
        .test("Adds", |a| ensure_eq(a.operands.iter().sum::<i64>(), 10))
        .test("Multiplies", |a| {
            ensure_eq(a.operands.iter().product::<i64>(), 30)
        })
        .member(Member::<Arithmetic>::test("ParsesDigits", parse_letters).expecting("ParseIntError"))
        .member(Member::<Arithmetic>::test("Overflows", |_| fail("not implemented")).ignore())
        .cleanup("TearDown", |a| {
            a.operands.clear();
            Ok(())
        });

    let queue = Suite::<Queue>::with_default("QueueTests")
        .test_async("DrainsInOrder", |q| {
            Box::pin(async move {
                q.items.extend(["a", "b", "c"].map(String::from));
                let drained: Vec<String> = q.items.drain(..).collect();
                ensure_eq(drained.join(""), "abc".to_string())
            })
        })
        .test("StartsEmpty", |q| ensure(q.items.is_empty(), "queue was not empty"));

    TestModule::new(SAMPLE_MODULE).suite(arithmetic).suite(queue)
}

fn parse_letters(_: &mut Arithmetic) -> suiterun_core::TestOutcome {
    "12a".parse::<i64>()?;
    Ok(())
}

fn broken_module() -> TestModule {
    let ledger = Suite::new("LedgerTests", || Ok(Ledger { balance: 100 }))
        .test("Withdraws", |l: &mut Ledger| {
            l.balance -= 30;
            ensure_eq(l.balance, 70)
        })
        .test("Overdraws", |l: &mut Ledger| {
            l.balance -= 200;
            ensure(l.balance >= 0, format!("balance went negative: {}", l.balance))
        })
        .test("Deposits", |l: &mut Ledger| {
            l.balance += 10;
            Ok(())
        });

    let unready = Suite::<Queue>::with_default("UnreadyTests")
        .initialize("Connect", |_| fail("backend unavailable"))
        .test("Sends", |_| Ok(()))
        .test("Receives", |_| Ok(()));

    TestModule::new(BROKEN_MODULE).suite(ledger).suite(unready)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_registry_exposes_both_modules() {
        let registry = registry();
        assert_eq!(registry.module_names(), vec![BROKEN_MODULE, SAMPLE_MODULE]);

        let sample = registry.module(SAMPLE_MODULE).unwrap();
        let names: Vec<&str> = sample
            .suites()
            .iter()
            .map(|s| s.metadata().name.as_str())
            .collect();
        assert_eq!(names, vec!["ArithmeticTests", "QueueTests"]);
    }

    #[test]
    fn test_sample_suite_shape() {
        let registry = registry();
        let sample = registry.module(SAMPLE_MODULE).unwrap();
        let arithmetic = sample.suites()[0].metadata();
        assert_eq!(
            arithmetic.eligible_tests(),
            vec!["Adds", "Multiplies", "ParsesDigits"]
        );
        assert_eq!(arithmetic.ignored_tests(), vec!["Overflows"]);
    }
}
