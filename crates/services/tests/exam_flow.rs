use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use ham_core::model::{ExamConfig, LicenseClass, OptionKey, Question, QuestionId, SeedKind};
use ham_core::time::fixed_clock;
use services::{
    AppServices, ExamController, ExamState, FollowUp, LedgerService, SeedService, TickOutcome,
};
use storage::repository::{InMemoryStore, KeyValueStore, StorageError};

fn question(raw_id: &str) -> Question {
    let options: BTreeMap<OptionKey, String> = OptionKey::ALL
        .iter()
        .map(|key| (*key, format!("{raw_id} choice {key}")))
        .collect();
    Question::new(
        QuestionId::new(raw_id).unwrap(),
        format!("{raw_id} text"),
        options,
        OptionKey::C,
    )
}

fn bank() -> Vec<Question> {
    let technician = (1..=40).map(|n| question(&format!("T{n:03}")));
    let general = (1..=10).map(|n| question(&format!("G{n:03}")));
    technician.chain(general).collect()
}

fn technician_exam(services: &AppServices) -> ExamController {
    ExamController::new(
        LicenseClass::Technician,
        &bank(),
        services.seeds(),
        services.ledger(),
    )
    .with_clock(services.clock())
}

fn wrong_key(correct: OptionKey) -> OptionKey {
    OptionKey::ALL
        .into_iter()
        .find(|key| *key != correct)
        .unwrap()
}

#[tokio::test]
async fn thirty_of_thirty_five_passes_technician() {
    let services = AppServices::in_memory(fixed_clock()).await;
    let mut exam = technician_exam(&services);
    assert_eq!(exam.config(), ExamConfig::for_class(LicenseClass::Technician));

    exam.start().await.unwrap();
    let total = exam.session().unwrap().len();
    assert_eq!(total, 35);

    let mut missed = Vec::new();
    for index in 0..total {
        exam.go_to(index).unwrap();
        let presented = exam.present_current().unwrap();
        let key = if index < 30 {
            presented.shuffled.correct_answer
        } else {
            missed.push(presented.id.clone());
            wrong_key(presented.shuffled.correct_answer)
        };
        assert_eq!(exam.select_answer(key).unwrap(), FollowUp::Stay);
    }

    let result = exam.submit().await.unwrap();
    assert_eq!(result.correct_count, 30);
    assert_eq!(result.total, 35);
    assert_eq!(result.pass_mark, 26);
    assert!(result.passed);
    assert_eq!(result.percentage(), 86);
    assert!(matches!(exam.state(), ExamState::Submitted(r) if *r == result));
    assert_eq!(services.ledger().wrong_answers().await, missed);
}

#[tokio::test]
async fn timeout_grades_partial_attempt() {
    let services = AppServices::in_memory(fixed_clock()).await;
    let mut exam = technician_exam(&services);
    exam.start().await.unwrap();

    for index in 0..10 {
        exam.go_to(index).unwrap();
        let correct = exam.present_current().unwrap().shuffled.correct_answer;
        exam.select_answer(correct).unwrap();
    }

    let limit = exam.config().time_limit_secs;
    for _ in 1..limit {
        assert!(matches!(exam.tick().await, TickOutcome::Remaining(_)));
    }
    let TickOutcome::Expired(result) = exam.tick().await else {
        panic!("countdown did not expire at zero");
    };
    assert_eq!(result.correct_count, 10);
    assert_eq!(result.total, 35);
    assert!(!result.passed);
    assert!(services.ledger().wrong_answers().await.is_empty());
    assert_eq!(exam.tick().await, TickOutcome::Inactive);
}

#[tokio::test]
async fn each_attempt_gets_a_fresh_exam_seed() {
    let services = AppServices::in_memory(fixed_clock()).await;
    let practice_seed = services.seeds().get_seed(SeedKind::Practice).await;
    let mut exam = technician_exam(&services);

    exam.start().await.unwrap();
    let first_seed = exam.session().unwrap().seed().clone();
    let first_ids: Vec<QuestionId> = exam
        .session()
        .unwrap()
        .questions()
        .iter()
        .map(|q| q.id().clone())
        .collect();
    exam.close();

    exam.start().await.unwrap();
    let second_seed = exam.session().unwrap().seed().clone();
    let second_ids: Vec<QuestionId> = exam
        .session()
        .unwrap()
        .questions()
        .iter()
        .map(|q| q.id().clone())
        .collect();

    assert_ne!(first_seed, second_seed);
    assert_ne!(first_ids, second_ids);
    assert_eq!(
        services.seeds().get_seed(SeedKind::Exam).await,
        second_seed
    );
    assert_eq!(
        services.seeds().get_seed(SeedKind::Practice).await,
        practice_seed
    );
}

#[tokio::test]
async fn scoring_twice_gives_the_same_grade() {
    let services = AppServices::in_memory(fixed_clock()).await;
    let mut exam = technician_exam(&services);
    exam.start().await.unwrap();
    for index in (0..35).step_by(3) {
        exam.go_to(index).unwrap();
        exam.select_answer(OptionKey::B).unwrap();
    }
    let first = exam.score().await.unwrap();
    let second = exam.score().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.unanswered, 35 - 12);
}

#[tokio::test]
async fn auto_advance_walks_to_submission() {
    let services = AppServices::in_memory(fixed_clock()).await;
    let mut exam = technician_exam(&services).with_auto_advance(true);
    exam.start().await.unwrap();

    let mut submitted = None;
    for step in 0..35 {
        let presented = exam.present_current().unwrap();
        assert_eq!(presented.number, step + 1);
        let follow_up = exam
            .select_answer(presented.shuffled.correct_answer)
            .unwrap();
        match exam.apply_follow_up(follow_up).await {
            Some(services::Advance::Moved(index)) => assert_eq!(index, step + 1),
            Some(services::Advance::Submitted(result)) => submitted = Some(result),
            None => panic!("auto-advance produced no follow-up"),
        }
    }

    let result = submitted.unwrap();
    assert_eq!(result.correct_count, 35);
    assert_eq!(result.percentage(), 100);
}

/// Store whose writes fail once `writes_left` reaches zero; reads keep working.
struct WriteLimitedStore {
    inner: InMemoryStore,
    writes_left: Mutex<usize>,
}

#[async_trait]
impl KeyValueStore for WriteLimitedStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        {
            let mut left = self.writes_left.lock().unwrap();
            if *left == 0 {
                return Err(StorageError::ReadOnly);
            }
            *left -= 1;
        }
        self.inner.set(key, value).await
    }
    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key).await
    }
    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.inner.keys().await
    }
}

#[tokio::test]
async fn exam_grades_with_displayed_seed_when_seed_write_fails() {
    let store: Arc<dyn KeyValueStore> = Arc::new(WriteLimitedStore {
        inner: InMemoryStore::new(),
        writes_left: Mutex::new(1),
    });
    let seeds = Arc::new(SeedService::new(fixed_clock(), Arc::clone(&store)));
    let ledger = Arc::new(LedgerService::new(store));
    let stale = seeds.get_seed(SeedKind::Exam).await;

    let pool: Vec<Question> = (1..=9).map(|n| question(&format!("T{n:03}"))).collect();
    let mut exam = ExamController::new(LicenseClass::Technician, &pool, Arc::clone(&seeds), ledger)
        .with_clock(fixed_clock());
    exam.start().await.unwrap();
    let shown = exam.session().unwrap().seed().clone();
    assert_ne!(shown, stale);
    assert_eq!(seeds.get_seed(SeedKind::Exam).await, shown);

    let total = exam.session().unwrap().len();
    assert_eq!(total, 9);
    for index in 0..total {
        exam.go_to(index).unwrap();
        let key = exam.present_current().unwrap().shuffled.correct_answer;
        exam.select_answer(key).unwrap();
    }

    let result = exam.submit().await.unwrap();
    assert_eq!(result.correct_count, 9);
    assert_eq!(result.total, 9);
}
