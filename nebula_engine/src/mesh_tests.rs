use super::*;
use crate::gpu::mock::MockContext;

#[test]
fn upload_and_draw_issues_one_indexed_draw_per_primitive() {
    let ctx = MockContext::new();
    let vertex_data = vec![0u8; 64];
    let index_data = vec![0u8; 12];
    let primitives = vec![
        Primitive {
            vertex_offset: 0,
            index_offset: 0,
            index_count: 3,
            index_stride: 2,
        },
        Primitive {
            vertex_offset: 32,
            index_offset: 6,
            index_count: 3,
            index_stride: 2,
        },
    ];

    let mesh = Mesh::upload(&ctx, &vertex_data, &index_data, primitives).unwrap();
    assert_eq!(mesh.primitives().len(), 2);

    let mut cmd = ctx.create_command_buffer().unwrap();
    mesh.draw(cmd.as_mut(), 5).unwrap();
}
