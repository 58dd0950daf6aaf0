//! Property tests for the session clock.

use focusdesk_core::{Phase, SessionClock, TickOutcome, TimerSettings};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Start,
    Pause,
    Tick(u16),
    Reset,
    Skip,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Start),
        1 => Just(Op::Pause),
        6 => (1u16..400).prop_map(Op::Tick),
        1 => Just(Op::Reset),
        1 => Just(Op::Skip),
    ]
}

fn settings() -> impl Strategy<Value = TimerSettings> {
    (1u32..=60, 1u32..=30).prop_map(|(f, b)| TimerSettings::new(f, b).unwrap())
}

proptest! {
    #[test]
    fn remaining_stays_within_phase(settings in settings(), ops in prop::collection::vec(op(), 1..60)) {
        let mut clock = SessionClock::new(settings);
        let mut focus_done = 0u32;

        for op in ops {
            match op {
                Op::Start => { clock.start(); }
                Op::Pause => { clock.pause(); }
                Op::Reset => {
                    clock.reset();
                    focus_done = 0;
                }
                Op::Skip => {
                    if clock.complete_phase().previous_phase == Phase::Focus {
                        focus_done += 1;
                    }
                }
                Op::Tick(n) => {
                    for _ in 0..n {
                        if let TickOutcome::Completed(done) = clock.tick() {
                            if done.previous_phase == Phase::Focus {
                                focus_done += 1;
                            }
                        }
                    }
                }
            }
            let remaining = clock.seconds_remaining();
            prop_assert!(remaining >= 1);
            prop_assert!(remaining <= clock.phase_total_secs());
            prop_assert_eq!(clock.session().completed_focus_phases, focus_done);
            prop_assert_eq!(clock.state().is_running(), clock.is_running());
        }
    }

    #[test]
    fn full_focus_run_completes_once(settings in settings(), extra in 0u32..120) {
        let mut clock = SessionClock::new(settings);
        clock.start();

        let mut completions = 0;
        for _ in 0..(settings.focus_minutes * 60 + extra) {
            if let TickOutcome::Completed(_) = clock.tick() {
                completions += 1;
            }
        }
        prop_assert_eq!(completions, 1);
        prop_assert_eq!(clock.phase(), Phase::Break);
        prop_assert!(!clock.is_running());
        prop_assert_eq!(clock.seconds_remaining(), settings.break_minutes * 60);
    }

    #[test]
    fn paused_clock_ignores_ticks(settings in settings(), ticks in 1u32..500) {
        let mut clock = SessionClock::new(settings);
        let before = clock.session().clone();
        for _ in 0..ticks {
            prop_assert_eq!(clock.tick(), TickOutcome::Ignored);
        }
        prop_assert_eq!(clock.session(), &before);
    }
}
