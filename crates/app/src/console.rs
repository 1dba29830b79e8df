//! Line-oriented console front end for practice and exam sessions.

use std::error::Error;
use std::io;

use ham_core::model::{
    ExamResult, OptionKey, PresentedQuestion, Question, QuestionScope, StudyMode, format_countdown,
};
use services::{
    Advance, ExamController, FollowUp, LedgerService, PracticeService, PracticeSession,
    TickOutcome,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

pub type Input = Lines<BufReader<Stdin>>;

#[must_use]
pub fn stdin_lines() -> Input {
    BufReader::new(tokio::io::stdin()).lines()
}

fn print_question(presented: &PresentedQuestion, selected: Option<OptionKey>) {
    println!();
    println!("[{}] {}", presented.position_label(), presented.id);
    println!("{}", presented.text);
    if let Some(image) = &presented.image {
        println!("  (figure: {image})");
    }
    if presented.shuffled.is_degenerate() {
        println!("  (this question has no answer choices)");
    }
    for (key, text) in &presented.shuffled.options {
        let marker = if selected == Some(*key) { '>' } else { ' ' };
        println!(" {marker}{key}. {text}");
    }
}

fn print_result(result: &ExamResult) {
    let verdict = if result.passed { "PASS" } else { "FAIL" };
    println!();
    println!(
        "Score {}/{} ({}%): {verdict}, pass mark {}",
        result.correct_count,
        result.total,
        result.percentage(),
        result.pass_mark
    );
}

//
// ─── PRACTICE ──────────────────────────────────────────────────────────────────
//

const PRACTICE_HELP: &str =
    "a-d answer | n next | p previous | g <n> go to | note [text] | unnote | q quit";

/// Interactive practice loop. Returns when the user quits or input ends.
pub async fn run_practice(
    practice: &PracticeService,
    ledger: &LedgerService,
    bank: &[Question],
    mode: StudyMode,
    scope: QuestionScope,
    input: &mut Input,
) -> Result<(), Box<dyn Error>> {
    let mut session = practice.start(bank, mode, scope).await?;
    println!(
        "{} over {} ({} questions). {PRACTICE_HELP}",
        mode.display_name(),
        scope,
        session.len()
    );
    show_practice(&session, ledger).await;

    while let Some(line) = input.next_line().await? {
        let line = line.trim();
        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        match word {
            "" => {}
            "q" | "quit" => break,
            "h" | "help" | "?" => println!("{PRACTICE_HELP}"),
            "n" | "next" => {
                if practice.next(&mut session).await? {
                    show_practice(&session, ledger).await;
                } else {
                    println!("Last question reached.");
                }
            }
            "p" | "prev" => {
                if practice.previous(&mut session).await? {
                    show_practice(&session, ledger).await;
                } else {
                    println!("Already at the first question.");
                }
            }
            "g" | "goto" => match rest.trim().parse::<usize>() {
                Ok(number) => match practice.go_to(&mut session, number).await {
                    Ok(()) => show_practice(&session, ledger).await,
                    Err(err) => println!("{err}"),
                },
                Err(_) => println!("usage: g <question number>"),
            },
            "note" => edit_note(&session, ledger, rest).await?,
            "unnote" => remove_note(&session, ledger).await?,
            other => match other.parse::<OptionKey>() {
                Ok(key) => {
                    let feedback = practice.answer(&mut session, key).await?;
                    if feedback.is_correct {
                        println!("Correct.");
                    } else {
                        println!("Incorrect. The answer is {}.", feedback.correct_answer);
                    }
                }
                Err(_) => println!("unknown command; {PRACTICE_HELP}"),
            },
        }
    }
    Ok(())
}

async fn show_practice(session: &PracticeSession, ledger: &LedgerService) {
    let Some(presented) = session.present() else {
        return;
    };
    let selected = session.feedback().map(|feedback| feedback.selected);
    let wrong_before = ledger.is_wrong(&presented.id).await;
    print_question(&presented, selected);
    if let Some(refs) = &presented.refs {
        println!("  ref {refs}");
    }
    if wrong_before {
        println!("  (in your wrong-answer list)");
    }
    let note = ledger.note(&presented.id).await;
    if !note.is_empty() {
        println!("  note: {note}");
    }
}

async fn edit_note(
    session: &PracticeSession,
    ledger: &LedgerService,
    text: &str,
) -> Result<(), Box<dyn Error>> {
    let Some(question) = session.current_question() else {
        return Ok(());
    };
    let text = text.trim();
    if text.is_empty() {
        let note = ledger.note(question.id()).await;
        if note.is_empty() {
            println!("No note for {}.", question.id());
        } else {
            println!("  note: {note}");
        }
        return Ok(());
    }
    ledger.save_note(question.id(), text).await?;
    println!("Note saved.");
    Ok(())
}

async fn remove_note(
    session: &PracticeSession,
    ledger: &LedgerService,
) -> Result<(), Box<dyn Error>> {
    if let Some(question) = session.current_question() {
        ledger.save_note(question.id(), "").await?;
        println!("Note removed.");
    }
    Ok(())
}

//
// ─── EXAM ──────────────────────────────────────────────────────────────────────
//

const EXAM_HELP: &str =
    "a-d answer | n next | p previous | g <n> go to | t time | s submit | q abandon";

enum ExamEvent {
    Line(io::Result<Option<String>>),
    Tick,
}

enum ExamStep {
    Continue,
    Finished(ExamResult),
    Abandoned,
}

/// Interactive exam. Returns the result, or `None` if the attempt was
/// abandoned.
pub async fn run_exam(
    exam: &mut ExamController,
    input: &mut Input,
) -> Result<Option<ExamResult>, Box<dyn Error>> {
    exam.start().await?;
    let config = exam.config();
    let total = exam.session().map_or(0, |session| session.len());
    println!(
        "{} exam: {total} questions, pass mark {}, {} minutes. {EXAM_HELP}",
        exam.class().display_name(),
        config.pass_mark,
        config.time_limit_minutes()
    );
    show_exam(exam);

    loop {
        let event = tokio::select! {
            line = input.next_line() => ExamEvent::Line(line),
            () = exam.wait_tick() => ExamEvent::Tick,
        };

        match event {
            ExamEvent::Tick => match exam.tick().await {
                TickOutcome::Remaining(secs) => {
                    if secs % 300 == 0 || secs == 60 || secs <= 10 {
                        println!("  time left {}", format_countdown(secs));
                    }
                }
                TickOutcome::Expired(result) => {
                    println!("Time is up.");
                    print_result(&result);
                    return Ok(Some(result));
                }
                TickOutcome::Inactive => {}
            },
            ExamEvent::Line(line) => {
                let Some(line) = line? else {
                    exam.close();
                    return Ok(None);
                };
                match handle_exam_line(exam, line.trim()).await? {
                    ExamStep::Continue => {}
                    ExamStep::Finished(result) => {
                        print_result(&result);
                        return Ok(Some(result));
                    }
                    ExamStep::Abandoned => return Ok(None),
                }
            }
        }
    }
}

fn show_exam(exam: &ExamController) {
    let Some(session) = exam.session() else {
        return;
    };
    if let Some(presented) = session.present_current() {
        print_question(&presented, session.answer_at(session.current_index()));
    }
}

async fn handle_exam_line(
    exam: &mut ExamController,
    line: &str,
) -> Result<ExamStep, Box<dyn Error>> {
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let Some(session) = exam.session() else {
        return Ok(ExamStep::Abandoned);
    };
    let current = session.current_index();
    let total = session.len();

    match word {
        "" => {}
        "h" | "help" | "?" => println!("{EXAM_HELP}"),
        "t" | "time" => {
            println!(
                "  time left {}, answered {}/{total}",
                session.countdown(),
                session.answered_count()
            );
        }
        "n" | "next" => {
            if current + 1 < total {
                exam.go_to(current + 1)?;
                show_exam(exam);
            } else {
                println!("Last question. Type s to submit.");
            }
        }
        "p" | "prev" => {
            if current > 0 {
                exam.go_to(current - 1)?;
                show_exam(exam);
            }
        }
        "g" | "goto" => match rest.trim().parse::<usize>() {
            Ok(number) if number >= 1 => match exam.go_to(number - 1) {
                Ok(()) => show_exam(exam),
                Err(err) => println!("{err}"),
            },
            _ => println!("usage: g <question number>"),
        },
        "s" | "submit" => return Ok(ExamStep::Finished(exam.submit().await?)),
        "q" | "quit" => {
            exam.close();
            println!("Exam abandoned.");
            return Ok(ExamStep::Abandoned);
        }
        other => match other.parse::<OptionKey>() {
            Ok(key) => return answer_exam(exam, key).await,
            Err(_) => println!("unknown command; {EXAM_HELP}"),
        },
    }
    Ok(ExamStep::Continue)
}

async fn answer_exam(
    exam: &mut ExamController,
    key: OptionKey,
) -> Result<ExamStep, Box<dyn Error>> {
    let follow_up = exam.select_answer(key)?;
    if let Some(session) = exam.session() {
        println!(
            "  selected {key} (answered {}/{})",
            session.answered_count(),
            session.len()
        );
    }

    let delay = match follow_up {
        FollowUp::Stay => return Ok(ExamStep::Continue),
        FollowUp::Advance(delay) | FollowUp::Submit(delay) => delay,
    };
    tokio::time::sleep(delay).await;
    match exam.apply_follow_up(follow_up).await {
        Some(Advance::Moved(_)) => show_exam(exam),
        Some(Advance::Submitted(result)) => return Ok(ExamStep::Finished(result)),
        None => {}
    }
    Ok(ExamStep::Continue)
}
