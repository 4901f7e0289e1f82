fn sum(values: &[i32]) -> i32 {
    println!("计算开始");
    values.iter().sum()
}

fn main() {
    let first = sum(&[1, 2, 3, 4, 5]);
    println!("第一次计算: {}", first);
    let second = sum(&[5, 10, 20]);
    println!("第二次计算: {}", second);
    println!("最终结果: {}", first + second);
}
