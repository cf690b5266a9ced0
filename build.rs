use vergen::EmitBuilder;

fn main() {
    // 生成构建信息（只取构建时间，不依赖 git 仓库）
    EmitBuilder::builder()
        .build_date()
        .build_timestamp()
        .emit()
        .expect("Failed to generate build information");
}
