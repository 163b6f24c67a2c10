//! End-to-end tests against a real C# toolchain.
//!
//! Each test returns early when `mcs`/`mono` are not installed.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use sharpgrade_core::engine::Evaluator;
use sharpgrade_core::model::{TargetType, TestDefinition};
use sharpgrade_core::results::{ItemStatus, DOES_NOT_BUILD};
use sharpgrade_runner::{MonoRunner, Toolchain};

const CONCATENATION_CODE: &str = r#"
    using System;
    namespace Concatenation {
        public class Concatenator {
            public static string DoSomething(string input){ return input + "prime"; }
        }
    }"#;

const EXCEPTION_CODE: &str = r#"
    using System;
    namespace Concatenation {
        public class Concatenator {
            public static string DoSomething(string input){ return (1/(input.Length - input.Length)).ToString(); }
        }
    }"#;

const FIZZBUZZ_CODE: &str = r#"
public static string FizzBuzz(int n)
{
    if (n % 15 == 0) return "FizzBuzz";
    if (n % 3 == 0) return "Fizz";
    if (n % 5 == 0) return "Buzz";
    return n.ToString();
}"#;

fn toolchain_available() -> bool {
    let available = Toolchain::default().is_installed();
    if !available {
        eprintln!("skipping: mcs/mono not installed");
    }
    available
}

fn runner() -> Arc<MonoRunner> {
    Arc::new(MonoRunner::default().with_invoke_timeout(Duration::from_secs(20)))
}

fn concatenation(tests: Vec<TestDefinition>) -> Evaluator {
    Evaluator::new(
        TargetType::new("Concatenation", "Concatenator"),
        tests,
        runner(),
    )
}

fn concat_test(input: &str, expected: &str) -> TestDefinition {
    TestDefinition::expecting("basic concatenation test", vec![json!(input)], expected)
}

#[tokio::test]
async fn good_code_passes() {
    if !toolchain_available() {
        return;
    }
    let result = concatenation(vec![concat_test("MyInput", "MyInputprime")])
        .evaluate(CONCATENATION_CODE)
        .await;

    assert_eq!(result.tests().len(), 1);
    assert!(result.tests()[0].is_pass(), "{:?}", result.tests()[0]);
    assert!(!result.tests()[0].is_error());
    assert_eq!(result.score(), 1.0);
}

#[tokio::test]
async fn wrong_answer_fails_without_error() {
    if !toolchain_available() {
        return;
    }
    let result = concatenation(vec![concat_test("MyInput", "MyInput2prime")])
        .evaluate(CONCATENATION_CODE)
        .await;

    assert_eq!(result.tests()[0].status(), ItemStatus::Fail);
    assert_eq!(result.tests()[0].actual_result(), "MyInputprime");
}

#[tokio::test]
async fn trailing_garbage_does_not_build() {
    if !toolchain_available() {
        return;
    }
    let code = format!("{CONCATENATION_CODE} broken stuff at the end");
    let result = concatenation(vec![concat_test("MyInput", "MyInput2prime")])
        .evaluate(&code)
        .await;

    assert!(result.could_not_execute());
    assert_eq!(result.tests().len(), 1);
    assert!(result.tests()[0].is_error());
    assert_eq!(result.tests()[0].actual_result(), DOES_NOT_BUILD);
    assert!(result.summary().starts_with("Does not Build, "));
}

#[tokio::test]
async fn thrown_exception_is_error_item() {
    if !toolchain_available() {
        return;
    }
    let tests = (1..=3)
        .map(|i| concat_test("MyInput", &format!("ZZZMyInput{i}prime")))
        .collect();
    let result = concatenation(tests).evaluate(EXCEPTION_CODE).await;

    assert!(!result.could_not_execute());
    assert_eq!(result.tests().len(), 3);
    for item in result.tests() {
        assert!(item.is_error());
        assert!(item.actual_result().contains("DivideByZeroException"));
    }
    assert_eq!(result.score(), 0.0);
}

#[tokio::test]
async fn multiple_tests_all_pass() {
    if !toolchain_available() {
        return;
    }
    let tests = ["MyInput", "MyInput2", "MyInput3"]
        .iter()
        .map(|input| concat_test(input, &format!("{input}prime")))
        .collect();
    let result = concatenation(tests).evaluate(CONCATENATION_CODE).await;

    assert_eq!(result.summary(), "3/3 tests passed.");
    assert!(result.tests().iter().all(|t| t.is_pass()));
}

#[tokio::test]
async fn fizzbuzz_fragment_is_normalized_and_graded() {
    if !toolchain_available() {
        return;
    }
    let tests = vec![
        TestDefinition::expecting("Standard number is returned as string", vec![json!(1)], "1"),
        TestDefinition::expecting("3 is returned as 'Fizz'", vec![json!(3)], "Fizz"),
        TestDefinition::expecting("5 is returned as 'Buzz'", vec![json!(5)], "Buzz"),
        TestDefinition::expecting("15 is returned as 'FizzBuzz'", vec![json!(15)], "FizzBuzz"),
    ];
    let evaluator = Evaluator::new(
        TargetType::new("FizzBuzzSample", "FizzBuzzClass"),
        tests,
        runner(),
    );

    let graded = evaluator.grade(FIZZBUZZ_CODE).await;
    assert_eq!(graded.result.summary(), "4/4 tests passed.");
    assert_eq!(graded.result.score(), 1.0);
    let entry_point = graded.entry_point.unwrap_or_default();
    assert!(entry_point.contains("FizzBuzz(Int32)"), "{entry_point}");
}

#[tokio::test]
async fn instance_state_does_not_leak_between_tests() {
    if !toolchain_available() {
        return;
    }
    let code = r#"
namespace Counter {
    public class Tally {
        private int calls;
        public int Next() { calls++; return calls; }
    }
}"#;
    let tests = (0..3)
        .map(|i| TestDefinition::expecting(format!("call {i}"), vec![], 1))
        .collect();
    let evaluator = Evaluator::new(TargetType::new("Counter", "Tally"), tests, runner());

    let result = evaluator.evaluate(code).await;
    assert_eq!(result.summary(), "3/3 tests passed.");
}

#[tokio::test]
async fn arguments_are_coerced_to_parameter_types() {
    if !toolchain_available() {
        return;
    }
    let code = r#"
using System.Collections.Generic;
using System.Linq;
namespace Coercion {
    public class Mixer {
        public string Mix(long big, double ratio, char c, int[] xs, List<string> words, int? maybe) {
            return big + "|" + ratio.ToString(System.Globalization.CultureInfo.InvariantCulture)
                + "|" + c + "|" + xs.Sum() + "|" + string.Join(",", words) + "|" + (maybe.HasValue ? "some" : "none");
        }
    }
}"#;
    let test = TestDefinition::expecting(
        "mixed arguments",
        vec![
            json!(7),
            json!(2),
            json!("z"),
            json!([1, 2, 3]),
            json!(["a", "b"]),
            json!(null),
        ],
        "7|2|z|6|a,b|none",
    );
    let evaluator = Evaluator::new(TargetType::new("Coercion", "Mixer"), vec![test], runner());

    let result = evaluator.evaluate(code).await;
    assert!(result.tests()[0].is_pass(), "{:?}", result.tests()[0]);
}

#[tokio::test]
async fn collections_are_returned_as_json() {
    if !toolchain_available() {
        return;
    }
    let code = r#"
using System.Collections.Generic;
namespace Shapes {
    public class Maker {
        public Dictionary<string, int[]> Make(int n) {
            return new Dictionary<string, int[]> { { "evens", new[] { 0, 2, n } } };
        }
    }
}"#;
    let test = TestDefinition::expecting("dictionary", vec![json!(4)], json!({"evens": [0, 2, 4]}));
    let evaluator = Evaluator::new(TargetType::new("Shapes", "Maker"), vec![test], runner());

    let result = evaluator.evaluate(code).await;
    assert!(result.tests()[0].is_pass(), "{:?}", result.tests()[0]);
}

#[tokio::test]
async fn infinite_loop_times_out() {
    if !toolchain_available() {
        return;
    }
    let code = r#"
namespace Spin {
    public class Forever {
        public int Run() { while (true) { } }
    }
}"#;
    let runner = Arc::new(MonoRunner::default().with_invoke_timeout(Duration::from_secs(2)));
    let evaluator = Evaluator::new(
        TargetType::new("Spin", "Forever"),
        vec![TestDefinition::expecting("never returns", vec![], 0)],
        runner,
    );

    let result = evaluator.evaluate(code).await;
    assert!(result.tests()[0].is_error());
    assert_eq!(
        result.tests()[0].actual_result(),
        "invocation timed out after 2000ms"
    );
}

#[tokio::test]
async fn missing_target_type_is_build_failure() {
    if !toolchain_available() {
        return;
    }
    let evaluator = Evaluator::new(
        TargetType::new("Elsewhere", "Nobody"),
        vec![concat_test("MyInput", "MyInputprime")],
        runner(),
    );

    let result = evaluator.evaluate(CONCATENATION_CODE).await;
    assert!(result.could_not_execute());
    assert!(result.summary().contains("Elsewhere.Nobody"));
}
