//! Magic 8-ball answers and the percentile roll.

use rand::seq::SliceRandom;
use rand::Rng;

const EIGHT_BALL_ANSWERS: &[&str] = &[
    "It is certain.",
    "Without a doubt.",
    "Yes definitely.",
    "You may rely on it.",
    "As I see it, yes.",
    "Most likely.",
    "Outlook good.",
    "Signs point to yes.",
    "Reply hazy, try again.",
    "Ask again later.",
    "Better not tell you now.",
    "Cannot predict now.",
    "Concentrate and ask again.",
    "Don't count on it.",
    "My reply is no.",
    "My sources say no.",
    "Outlook not so good.",
    "Very doubtful.",
];

pub fn eight_ball_answer<R: Rng>(rng: &mut R) -> &'static str {
    EIGHT_BALL_ANSWERS.choose(rng).copied().unwrap_or(EIGHT_BALL_ANSWERS[0])
}

pub fn roll_percentile<R: Rng>(rng: &mut R) -> u8 {
    rng.gen_range(1..=100)
}
