use crate::core::job::ByteRange;

/// 把 `[0, total_size - 1]` 切成连续、互不重叠的字节范围
///
/// 每个范围长 `total_size / workers`，余数全部归最后一个范围。
/// 线程数大于总字节数时按总字节数截断，保证没有空范围；
/// 线程数为 0 时按 1 处理。
pub fn plan(total_size: u64, workers: usize) -> Vec<ByteRange> {
    if total_size == 0 {
        return Vec::new();
    }
    let workers = effective_workers(total_size, workers) as u64;
    let base = total_size / workers;

    (0..workers)
        .map(|i| {
            let start = i * base;
            let end = if i == workers - 1 {
                total_size - 1
            } else {
                (i + 1) * base - 1
            };
            ByteRange::new(start, end)
        })
        .collect()
}

/// 实际使用的线程数：`min(workers, total_size)`，至少为 1
pub fn effective_workers(total_size: u64, workers: usize) -> usize {
    let workers = workers.max(1) as u64;
    workers.min(total_size.max(1)) as usize
}
