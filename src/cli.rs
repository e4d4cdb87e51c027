use crate::Error;
use colored::Colorize;
use libmondai::media::DisplayResource;
use libmondai::player::QuizPlayer;
use libmondai::session::{Advance, AnswerOption, Mark, Score};
use log::debug;
use rand::Rng;
use text_io::read;

#[derive(Debug, PartialEq)]
pub(crate) enum Choice {
    Option(usize),
    Invalid,
    Quit,
}

impl Choice {
    pub(crate) fn from_str(choices_count: usize, input: &str) -> Choice {
        match input.trim() {
            "q" => Choice::Quit,
            input => match input.parse::<usize>() {
                Ok(num) if (1..=choices_count).contains(&num) => Choice::Option(num - 1),
                Ok(_) => {
                    println!(
                        "{}",
                        format!("There are only {} options available!", choices_count)
                            .bright_red()
                    );
                    Choice::Invalid
                }
                Err(_) => Choice::Invalid,
            },
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "kittygfx")] {
        use kitty_image::{Action, Command, WrappedCommand};
        use std::path::Path;

        fn show_media(resource: &DisplayResource, indent: usize) -> Result<(), Error> {
            let image_path = match resource {
                DisplayResource::Blob(blob) => blob.path(),
                DisplayResource::Literal(reference) if Path::new(reference).is_file() => {
                    Path::new(reference)
                }
                DisplayResource::Literal(reference) => {
                    println!("{}{}", " ".repeat(indent), reference.italic());
                    return Ok(());
                }
            };
            debug!("path at {image_path:?}");
            let (width, height) = image::image_dimensions(image_path)?;
            let action = Action::TransmitAndDisplay(
                kitty_image::ActionTransmission {
                    format: kitty_image::Format::Png,
                    medium: kitty_image::Medium::File,
                    width,
                    height,
                    ..Default::default()
                },
                kitty_image::ActionPut {
                    x_offset: 10 * indent as u32,
                    ..Default::default()
                },
            );
            let command = WrappedCommand::new(Command::with_payload_from_path(action, image_path));
            println!("{command}");
            print!("{}", "\n".repeat(height as usize / 20));
            Ok(())
        }
    } else {
        fn show_media(resource: &DisplayResource, indent: usize) -> Result<(), Error> {
            debug!("media at {}", resource);
            println!("{}{}", " ".repeat(indent), format!("[{}]", resource).italic());
            Ok(())
        }
    }
}

fn print_marked(options: &[AnswerOption], indent: &str) {
    for (i, option) in options.iter().enumerate() {
        let line = format!("{}. {} [{}]", i + 1, option.text, option.id);
        match option.mark {
            Some(Mark::Correct) => println!("{}{} {}", indent, "✔".bright_green(), line.bright_green()),
            Some(Mark::Wrong) => println!("{}{} {}", indent, "✘".bright_red(), line.bright_red()),
            None => println!("{}  {}", indent, line.dimmed()),
        }
    }
}

/// Plays every question of `player` in the terminal. `q` quits early.
pub(crate) fn cli_loop<R: Rng>(player: &mut QuizPlayer<'_, R>) -> Result<Score, Error> {
    loop {
        let Some(current) = player.session().current() else {
            break;
        };
        let options = current.options.to_vec();
        let leading = format!("{}/{}. ", current.position + 1, current.total);
        let indent = " ".repeat(leading.len());
        let is_last = current.position + 1 == current.total;

        println!(
            "{}{}",
            leading.cyan(),
            current.question.black().bold().on_white()
        );
        if let Some(resource) = player.media() {
            show_media(resource, leading.len())?;
        }
        for (i, option) in options.iter().enumerate() {
            println!("{}{}. {}", indent, format!("{}", i + 1).bold(), option.text);
        }

        let selected = loop {
            print!(
                "{} ",
                format!("Answer (1-{}, q to quit prematurely):", options.len()).cyan()
            );
            let choice_string: String = read!("{}\n");
            let choice = Choice::from_str(options.len(), &choice_string);
            debug!("choice: {:?}", choice);
            match choice {
                Choice::Option(num) => break &options[num].id,
                Choice::Invalid => continue,
                Choice::Quit => {
                    println!("{}", "Quitting Early!".cyan());
                    return Ok(player.session().score());
                }
            }
        };

        let verdict = player.submit_answer(selected)?;
        if verdict.is_correct {
            println!("{}", "Correct!".bright_green());
        } else {
            println!("{}", "Incorrect!".bright_red());
        }
        if let Some(current) = player.session().current() {
            print_marked(current.options, &indent);
        }

        let prompt = if is_last {
            "Press enter to finish..."
        } else {
            "Press enter for the next question..."
        };
        print!("{} ", prompt.cyan());
        let _: String = read!("{}\n");

        if let Advance::Finished(score) = player.advance()? {
            return Ok(score);
        }
    }

    Ok(player.session().score())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_choices() {
        assert_eq!(Choice::from_str(4, "q"), Choice::Quit);
        assert_eq!(Choice::from_str(4, "1"), Choice::Option(0));
        assert_eq!(Choice::from_str(4, " 4 "), Choice::Option(3));
        assert_eq!(Choice::from_str(4, "5"), Choice::Invalid);
        assert_eq!(Choice::from_str(4, "0"), Choice::Invalid);
        assert_eq!(Choice::from_str(4, "dunno"), Choice::Invalid);
    }
}
