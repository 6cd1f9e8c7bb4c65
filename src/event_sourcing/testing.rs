use std::fmt::Debug;
use std::marker::PhantomData;

use crate::event_sourcing::core::Aggregate;

// ============================================================================
// Given / When / Then harness for aggregate tests
// ============================================================================
//
//   TestFramework::<BankAccount>::default()
//       .given(vec![previous_event])
//       .when(command)
//       .then_expect_events(vec![expected_event]);
//
// ============================================================================

pub struct TestFramework<A> {
    _phantom: PhantomData<A>,
}

impl<A> Default for TestFramework<A> {
    fn default() -> Self {
        Self { _phantom: PhantomData }
    }
}

impl<A: Aggregate> TestFramework<A> {
    pub fn given_no_previous_events(self) -> AggregateTestExecutor<A> {
        AggregateTestExecutor { aggregate: A::default() }
    }

    pub fn given(self, events: Vec<A::Event>) -> AggregateTestExecutor<A> {
        let mut aggregate = A::default();
        for event in &events {
            aggregate.apply(event);
        }
        AggregateTestExecutor { aggregate }
    }
}

pub struct AggregateTestExecutor<A: Aggregate> {
    aggregate: A,
}

impl<A: Aggregate> AggregateTestExecutor<A> {
    pub fn when(self, command: A::Command) -> AggregateResultValidator<A> {
        AggregateResultValidator {
            result: self.aggregate.handle(command),
        }
    }
}

pub struct AggregateResultValidator<A: Aggregate> {
    result: Result<Vec<A::Event>, A::Error>,
}

impl<A> AggregateResultValidator<A>
where
    A: Aggregate,
    A::Event: PartialEq + Debug,
{
    pub fn then_expect_events(self, expected: Vec<A::Event>) {
        match self.result {
            Ok(events) => assert_eq!(events, expected),
            Err(err) => panic!("expected events {:?}, got error: {}", expected, err),
        }
    }

    /// Asserts the command was rejected with exactly this message
    pub fn then_expect_error_message(self, expected: &str) {
        match self.result {
            Ok(events) => panic!("expected error '{}', got events: {:?}", expected, events),
            Err(err) => assert_eq!(err.to_string(), expected),
        }
    }

    pub fn inspect_result(self) -> Result<Vec<A::Event>, A::Error> {
        self.result
    }
}
