use std::io::{self, BufRead, Write};

/// Prompts until a value parses and lies in `[min, max]`; `None` on EOF.
pub fn get_number<T, R>(input: &mut R, prompt: &str, min: T, max: T, default: T) -> io::Result<Option<T>>
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display + Copy,
    R: BufRead,
{
    loop {
        print!("{} [{}]: ", prompt, default);
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Some(default));
        }
        match trimmed.parse::<T>() {
            Ok(num) if num >= min && num <= max => return Ok(Some(num)),
            Ok(_) => println!("Please enter a value between {} and {}", min, max),
            Err(_) => println!("Please enter a valid number"),
        }
    }
}

/// Prompts for one of `options` by number or by name; `None` on EOF.
pub fn get_choice<R: BufRead>(input: &mut R, prompt: &str, options: &[&str]) -> io::Result<Option<String>> {
    let default = options.first().copied().unwrap_or_default();
    loop {
        println!("{}:", prompt);
        for (i, option) in options.iter().enumerate() {
            println!("  {}) {}", i + 1, option);
        }
        print!("Choice [{}]: ", default);
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Some(default.to_string()));
        }
        if let Ok(n) = trimmed.parse::<usize>() {
            if (1..=options.len()).contains(&n) {
                return Ok(Some(options[n - 1].to_string()));
            }
        }
        if let Some(option) = options.iter().find(|o| o.eq_ignore_ascii_case(trimmed)) {
            return Ok(Some(option.to_string()));
        }
        println!("Please pick one of the listed options");
    }
}
