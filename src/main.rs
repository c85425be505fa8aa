use std::time::Instant;

use tokio::io::{AsyncBufReadExt, BufReader};

use kt_tutor::config::TutorConfig;
use kt_tutor::logging;
use kt_tutor::model::ProgressReport;
use kt_tutor::session::HintState;

const MAX_TRIES_PER_PROBLEM: u32 = 3;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = TutorConfig::from_env();
    let _log_guard = logging::init_tracing(&config);

    let mut session = match kt_tutor::create_session(&config) {
        Ok(session) => session,
        Err(err) => {
            tracing::error!(error = %err, "failed to load skill graph");
            return;
        }
    };

    tracing::info!(
        user_id = %config.user_id,
        data_dir = %config.data_dir.display(),
        threshold = config.scheduler.mastery_threshold,
        "tutor session started"
    );
    println!("Commands: `hint`, `progress`, `quit`.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    'problems: loop {
        let problem = match session.next_problem().await {
            Ok(problem) => problem,
            Err(err) => {
                tracing::error!(error = %err, "could not schedule a problem");
                break;
            }
        };

        println!("\n[{} | level {}] {}", problem.skill_id, problem.difficulty, problem.prompt);

        let started = Instant::now();
        let mut hints = HintState::new();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break 'problems,
                Err(err) => {
                    tracing::error!(error = %err, "failed to read input");
                    break 'problems;
                }
            };

            match line.trim() {
                "" => continue,
                "quit" => break 'problems,
                "progress" => {
                    print_progress(&session.progress());
                    continue;
                }
                "hint" => {
                    match hints.reveal() {
                        Some(hint) => println!("Hint: {hint}"),
                        None => println!("Give it a try first."),
                    }
                    continue;
                }
                answer => {
                    let elapsed = started.elapsed().as_millis() as u64;
                    let feedback = session.submit(&problem, answer, elapsed, hints.hints_used());

                    if feedback.correct {
                        println!(
                            "Correct! mastery {:.2} -> {:.2}",
                            feedback.mastery_before, feedback.mastery_after
                        );
                        continue 'problems;
                    }

                    match feedback.diagnosis {
                        Some(d) => {
                            let note = d
                                .explanation
                                .clone()
                                .unwrap_or_else(|| "That looks like a common slip.".to_string());
                            println!("Not quite. {note} Type `hint` for help.");
                            hints.set_diagnosis(d);
                        }
                        None if hints.diagnosis().is_some() => println!("Not quite. Type `hint` for help."),
                        None => println!("Not quite."),
                    }

                    if feedback.attempts_count >= MAX_TRIES_PER_PROBLEM {
                        println!("The answer was {}.", problem.answer);
                        continue 'problems;
                    }
                }
            }
        }
    }

    print_progress(&session.progress());
    tracing::info!("tutor session ended");
}

fn print_progress(report: &ProgressReport) {
    println!("\nProgress for {}:", report.user_id);
    for skill in &report.skills {
        let tags = if skill.misconceptions.is_empty() {
            String::new()
        } else {
            format!("  [{}]", skill.misconceptions.join(", "))
        };
        println!(
            "  {:<12} {:>5.2}  {}{}",
            skill.skill_id,
            skill.mastery,
            skill.status.as_str(),
            tags
        );
    }
    println!("  mastered: {}/{}", report.mastered_count(), report.skills.len());
}
