use std::io::Write;
use std::process::Command;

fn main() {
    let child = Command::new("sleep").arg("1000").spawn().unwrap();
    println!("{}", child.id());
    std::io::stdout().flush().unwrap();

    let mut counter: u64 = 0;
    loop {
        counter = std::hint::black_box(counter.wrapping_add(1));
    }
}
