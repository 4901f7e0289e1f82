fn main() {
    let values: Vec<u32> = Vec::new();
    println!("partial output");
    let first = values.first().copied();
    let value = first.expect("no values to process");
    println!("{}", value);
}
