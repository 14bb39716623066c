//! 4x100m relay simulation with one thread per runner.
//!
//! Roster: the women's 4x100m relay final at the Tokyo 2020 Olympics (the
//! real teams took between 41 and 42 seconds).

use colored::Colorize;
use relay_race::{Race, RaceConfig, RaceError, RosterTeam};

fn roster() -> Vec<RosterTeam> {
    vec![
        RosterTeam::new(
            "Jamaica",
            [
                "Briana Williams",
                "Elaine Thompson-Herah",
                "Shelly-Ann Fraser-Pryce",
                "Shericka Jackson",
            ],
        ),
        RosterTeam::new(
            "United States",
            [
                "Javianne Oliver",
                "Teahna Daniels",
                "Jenna Prandini",
                "Gabrielle Thomas",
            ],
        ),
        RosterTeam::new(
            "Great Britain",
            [
                "Asha Philip",
                "Imani Lansiquot",
                "Dina Asher-Smith",
                "Daryll Neita",
            ],
        ),
        RosterTeam::new(
            "Switzerland",
            [
                "Ajla Del Ponte",
                "Mujinga Kambundji",
                "Salomé Kora",
                "Riccarda Dietsche",
            ],
        ),
    ]
}

fn main() -> Result<(), RaceError> {
    let race = Race::new(roster(), RaceConfig::default())?;
    let outcome = race.run();

    println!("\n{}", "TEAM RESULTS".bold());
    for result in &outcome.teams {
        println!(
            "Team {} = {:.2} s ({} exchanges)",
            result.name, result.total_time, result.exchange_count
        );
    }
    println!();
    Ok(())
}
