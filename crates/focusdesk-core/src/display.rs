//! Text helpers shared by front ends.

use rand::seq::SliceRandom;
use serde::Serialize;

use crate::timer::Phase;

/// `MM:SS`, minutes not wrapped at 60.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Title and body for the alert shown when `previous_phase` ends.
pub fn alert_text(previous_phase: Phase) -> (&'static str, &'static str) {
    match previous_phase {
        Phase::Focus => ("Pomodoro Complete!", "Time for a break!"),
        Phase::Break => ("Break Complete!", "Time to focus!"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub text: &'static str,
    pub author: &'static str,
}

const fn quote(text: &'static str, author: &'static str) -> Quote {
    Quote { text, author }
}

pub const QUOTES: &[Quote] = &[
    quote("The way to get started is to quit talking and begin doing.", "Walt Disney"),
    quote("Don't watch the clock; do what it does. Keep going.", "Sam Levenson"),
    quote("The future depends on what you do today.", "Mahatma Gandhi"),
    quote("Focus on being productive instead of busy.", "Tim Ferriss"),
    quote(
        "It's not about time, it's about choices. How are you spending your choices?",
        "Beverly Adamo",
    ),
    quote("Until we can manage time, we can manage nothing else.", "Peter Drucker"),
    quote("Time is the most valuable thing a man can spend.", "Theophrastus"),
    quote("Lost time is never found again.", "Benjamin Franklin"),
    quote(
        "The key is not to prioritize what's on your schedule, but to schedule your priorities.",
        "Stephen Covey",
    ),
    quote(
        "Productivity is never an accident. It is always the result of a commitment to excellence, intelligent planning, and focused effort.",
        "Paul J. Meyer",
    ),
    quote("The only way around is through.", "Robert Frost"),
    quote("You miss 100% of the shots you don't take.", "Wayne Gretzky"),
    quote(
        "Success is not final, failure is not fatal: it is the courage to continue that counts.",
        "Winston Churchill",
    ),
    quote(
        "The most difficult thing is the decision to act, the rest is merely tenacity.",
        "Amelia Earhart",
    ),
    quote(
        "Twenty years from now you will be more disappointed by the things you didn't do than by the ones you did do.",
        "Mark Twain",
    ),
];

pub fn random_quote() -> Quote {
    QUOTES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(QUOTES[0])
}
