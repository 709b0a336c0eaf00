#[macro_use]
extern crate trackable;

use blockalloc::allocator::{Allocator, BlockAllocator, BlockAllocatorCell, SystemAllocator};
use blockalloc::container::FixedCapacityVec;
use blockalloc::map::OrderedMap;
use blockalloc::Result;

fn factorial(n: i32) -> u64 {
    (1..=n as u64).product()
}

fn render_map<A>(title: &str, map: &OrderedMap<i32, u64, A>) -> String
where
    A: allocator_api2::alloc::Allocator,
{
    let mut s = format!("{}:\n", title);
    for (key, value) in map {
        s += &format!("{} {}\n", key, value);
    }
    s
}

fn fill<A>(vec: &mut FixedCapacityVec<i32, 10, A>) -> Result<()>
where
    A: Allocator<Value = i32>,
{
    for i in 0..10 {
        track!(vec.push(i))?;
    }
    Ok(())
}

fn render_vec<A>(title: &str, vec: &FixedCapacityVec<i32, 10, A>) -> String
where
    A: Allocator<Value = i32>,
{
    let mut s = format!("{}:\n", title);
    for value in vec {
        s += &format!("{}\n", value);
    }
    s
}

fn main() {
    let mut std_map = OrderedMap::new();
    for i in 0..10 {
        std_map.insert(i, factorial(i));
    }
    print!("{}", render_map("Standard map", &std_map));

    let mut block_map = OrderedMap::new_in(BlockAllocatorCell::<(i32, u64)>::new());
    for i in 0..10 {
        block_map.insert(i, factorial(i));
    }
    print!("{}", render_map("Block allocator map", &block_map));

    let mut std_vec = FixedCapacityVec::<i32, 10, SystemAllocator<i32>>::new();
    track_try_unwrap!(fill(&mut std_vec));
    print!("{}", render_vec("Container", &std_vec));

    let mut block_vec = FixedCapacityVec::<i32, 10, BlockAllocator<i32>>::new();
    track_try_unwrap!(fill(&mut block_vec));
    print!("{}", render_vec("Block allocator container", &block_vec));
}

#[cfg(test)]
mod tests {
    use trackable::result::TestResult;

    use super::*;

    #[test]
    fn map_output_has_header_and_one_pair_per_line() {
        let mut map = OrderedMap::new_in(BlockAllocatorCell::<(i32, u64)>::new());
        for i in 0..4 {
            map.insert(i, factorial(i));
        }
        assert_eq!(
            render_map("Block allocator map", &map),
            "Block allocator map:\n0 1\n1 1\n2 2\n3 6\n"
        );
    }

    #[test]
    fn container_output_has_header_and_one_element_per_line() -> TestResult {
        let mut vec = FixedCapacityVec::<i32, 10, BlockAllocator<i32>>::new();
        track!(fill(&mut vec))?;
        let expected = (0..10).fold("Container:\n".to_owned(), |s, i| s + &format!("{}\n", i));
        assert_eq!(render_vec("Container", &vec), expected);
        Ok(())
    }
}
