use rand::{Rng, RngCore};

use crate::model::{MisconceptionRule, Problem, ProblemOrigin, Trigger};
use crate::registry::ProblemGenerator;

const NOT_A_NUMBER: &str = r"^[^0-9\-]*$";

fn operand_max(difficulty: u8, floor: u32, step: u32) -> u32 {
    floor + step * u32::from(difficulty.saturating_sub(1))
}

fn problem_id(skill_id: &str, a: u32, b: u32) -> String {
    format!("{skill_id}:{a}:{b}")
}

fn not_a_number_rule(skill_id: &str) -> MisconceptionRule {
    MisconceptionRule::new(format!("{skill_id}.nan"), "non_numeric_answer", Trigger::regex(NOT_A_NUMBER))
        .with_hints(["Answer with digits only.", "Type the number, for example 12."])
}

/// Single-digit addition.
pub struct AddSingle;

impl ProblemGenerator for AddSingle {
    fn generate(&self, difficulty: u8, rng: &mut dyn RngCore) -> Problem {
        let max = operand_max(difficulty, 4, 1).min(9);
        let a = rng.random_range(1..=max);
        let b = rng.random_range(1..=max);
        let sum = a + b;

        let mut misconceptions = vec![MisconceptionRule::new(
            "add_single.concat",
            "digit_concatenation",
            Trigger::exact(format!("{a}{b}")),
        )
        .with_hints([
            "Adding joins two amounts into one amount.",
            format!("Start at {a} and count up {b} more.").as_str(),
        ])
        .with_explanation("The digits were written side by side instead of added.")];

        if sum > 1 {
            misconceptions.push(
                MisconceptionRule::new("add_single.off_by_one", "counting_off_by_one", Trigger::exact((sum - 1).to_string()))
                    .with_hints(["Check your count again.", format!("Count on from {a}: the first step is {}.", a + 1).as_str()]),
            );
        }
        misconceptions.push(not_a_number_rule("add_single"));

        Problem {
            id: problem_id("add_single", a, b),
            skill_id: "add_single".into(),
            difficulty,
            prompt: format!("{a} + {b} = ?"),
            answer: sum.to_string(),
            misconceptions,
            origin: ProblemOrigin::Local,
        }
    }
}

/// Single-digit subtraction with a non-negative result.
pub struct SubSingle;

impl ProblemGenerator for SubSingle {
    fn generate(&self, difficulty: u8, rng: &mut dyn RngCore) -> Problem {
        let max = operand_max(difficulty, 5, 1).min(9);
        let a = rng.random_range(1..=max);
        let b = rng.random_range(0..=a);

        let mut misconceptions = Vec::new();
        if b != 0 {
            misconceptions.push(
                MisconceptionRule::new("sub_single.added", "added_instead_of_subtracted", Trigger::exact((a + b).to_string()))
                    .with_hints(["Look at the sign between the numbers.", "The minus sign means take away."]),
            );
        }
        misconceptions.push(
            MisconceptionRule::new("sub_single.negative", "sign_confusion", Trigger::regex(r"^-\d+$"))
                .with_hints(["The first number is the larger one here.", format!("Take {b} away from {a}.").as_str()]),
        );
        misconceptions.push(not_a_number_rule("sub_single"));

        Problem {
            id: problem_id("sub_single", a, b),
            skill_id: "sub_single".into(),
            difficulty,
            prompt: format!("{a} - {b} = ?"),
            answer: (a - b).to_string(),
            misconceptions,
            origin: ProblemOrigin::Local,
        }
    }
}

/// Two-digit addition where the ones column always carries.
pub struct AddCarry;

impl ProblemGenerator for AddCarry {
    fn generate(&self, difficulty: u8, rng: &mut dyn RngCore) -> Problem {
        let tens_max = operand_max(difficulty, 2, 1).min(8);
        let a_ones = rng.random_range(2..=9u32);
        let b_ones = rng.random_range((10 - a_ones)..=9u32);
        let a = rng.random_range(1..=tens_max) * 10 + a_ones;
        let b = rng.random_range(1..=tens_max) * 10 + b_ones;
        let sum = a + b;
        let no_carry = sum - 10;

        let misconceptions = vec![
            MisconceptionRule::new("add_carry.forgot", "forgot_carry", Trigger::exact(no_carry.to_string()))
                .with_hints([
                    "Add the ones column first.",
                    format!("{a_ones} + {b_ones} is more than 9, so carry a ten.").as_str(),
                    "Add the carried ten to the tens column.",
                ])
                .with_explanation("The ten from the ones column was not carried."),
            MisconceptionRule::new(
                "add_carry.columns",
                "wrote_column_sums",
                Trigger::exact(format!("{}{}", a / 10 + b / 10, a_ones + b_ones)),
            )
            .with_hints(["Each column holds only one digit.", "Carry the extra ten to the next column."]),
            not_a_number_rule("add_carry"),
        ];

        Problem {
            id: problem_id("add_carry", a, b),
            skill_id: "add_carry".into(),
            difficulty,
            prompt: format!("{a} + {b} = ?"),
            answer: sum.to_string(),
            misconceptions,
            origin: ProblemOrigin::Local,
        }
    }
}

/// Multiplication facts up to 12 x 12.
pub struct MulFacts;

impl ProblemGenerator for MulFacts {
    fn generate(&self, difficulty: u8, rng: &mut dyn RngCore) -> Problem {
        let max = operand_max(difficulty, 3, 1).min(12);
        let a = rng.random_range(2..=max.max(2));
        let b = rng.random_range(2..=max.max(2));

        let mut misconceptions = Vec::new();
        if a + b != a * b {
            misconceptions.push(
                MisconceptionRule::new("mul_facts.added", "added_instead_of_multiplied", Trigger::exact((a + b).to_string()))
                    .with_hints([
                        "x means groups of.",
                        format!("Think of {a} groups with {b} in each group.").as_str(),
                    ]),
            );
        }
        misconceptions.push(
            MisconceptionRule::new("mul_facts.neighbour", "adjacent_fact", Trigger::exact((a * (b - 1)).to_string()))
                .with_hints(["Close! Check how many groups you counted.", format!("Add one more group of {a}.").as_str()]),
        );
        misconceptions.push(not_a_number_rule("mul_facts"));

        Problem {
            id: problem_id("mul_facts", a, b),
            skill_id: "mul_facts".into(),
            difficulty,
            prompt: format!("{a} x {b} = ?"),
            answer: (a * b).to_string(),
            misconceptions,
            origin: ProblemOrigin::Local,
        }
    }
}
