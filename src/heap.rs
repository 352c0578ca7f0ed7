use glam::Vec3;

/// Interleaved vertex attributes, one record per mesh vertex.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Vertex {
    /// Object space position
    pub p: Vec3,
    /// Object space shading normal
    pub n: Vec3,
}

enum Slot {
    Indices(Vec<u32>),
    Vertices(Vec<Vertex>),
}

/// Flat indirect storage for per-instance geometry buffers.
///
/// Instance `i` owns two slots: `2 * i` holds its triangle index buffer and
/// `2 * i + 1` its vertex buffer. The heap is immutable once the scene has
/// been built.
pub struct GeometryHeap {
    slots: Vec<Slot>,
}

impl GeometryHeap {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Stores the buffers of a new instance and returns its id.
    pub fn push_instance(&mut self, indices: Vec<u32>, vertices: Vec<Vertex>) -> u32 {
        let id = (self.slots.len() / 2) as u32;
        self.slots.push(Slot::Indices(indices));
        self.slots.push(Slot::Vertices(vertices));
        id
    }

    pub fn instance_count(&self) -> u32 {
        (self.slots.len() / 2) as u32
    }

    /// Triangle index buffer of `instance`, stored at slot `2 * instance`.
    pub fn indices(&self, instance: u32) -> &[u32] {
        match &self.slots[(instance as usize) * 2] {
            Slot::Indices(buf) => buf,
            Slot::Vertices(_) => unreachable!("even heap slots hold index buffers"),
        }
    }

    /// Vertex buffer of `instance`, stored at slot `2 * instance + 1`.
    pub fn vertices(&self, instance: u32) -> &[Vertex] {
        match &self.slots[(instance as usize) * 2 + 1] {
            Slot::Vertices(buf) => buf,
            Slot::Indices(_) => unreachable!("odd heap slots hold vertex buffers"),
        }
    }

    /// Vertex indices of triangle `prim` of `instance`.
    pub fn triangle(&self, instance: u32, prim: u32) -> [u32; 3] {
        let indices = self.indices(instance);
        let first = (prim as usize) * 3;
        [indices[first], indices[first + 1], indices[first + 2]]
    }
}

impl Default for GeometryHeap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(p: Vec3) -> Vertex {
        Vertex {
            p,
            n: Vec3::new(0.0, 1.0, 0.0),
        }
    }

    #[test]
    fn instance_ids_are_sequential() {
        let mut heap = GeometryHeap::new();
        let a = heap.push_instance(vec![0, 1, 2], vec![v(Vec3::ZERO); 3]);
        let b = heap.push_instance(vec![0, 1, 2, 0, 2, 3], vec![v(Vec3::ONE); 4]);
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(heap.instance_count(), 2);
    }

    #[test]
    fn buffers_land_in_paired_slots() {
        let mut heap = GeometryHeap::new();
        heap.push_instance(vec![0, 1, 2], vec![v(Vec3::ZERO); 3]);
        let id = heap.push_instance(
            vec![2, 1, 0, 1, 2, 3],
            vec![
                v(Vec3::ZERO),
                v(Vec3::X),
                v(Vec3::Y),
                v(Vec3::Z),
            ],
        );

        assert_eq!(heap.indices(id), &[2, 1, 0, 1, 2, 3]);
        assert_eq!(heap.vertices(id).len(), 4);
        assert_eq!(heap.vertices(id)[1].p, Vec3::X);
        assert_eq!(heap.triangle(id, 0), [2, 1, 0]);
        assert_eq!(heap.triangle(id, 1), [1, 2, 3]);
    }

    #[test]
    fn instances_may_differ_in_size() {
        let mut heap = GeometryHeap::new();
        heap.push_instance(vec![0, 1, 2], vec![v(Vec3::ZERO); 3]);
        heap.push_instance((0..300).collect(), vec![v(Vec3::ZERO); 100]);
        assert_eq!(heap.indices(0).len(), 3);
        assert_eq!(heap.indices(1).len(), 300);
    }
}
