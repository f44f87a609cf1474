/// A dense vector computed from record text at write time.
#[derive(Debug, Clone)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(vec: Vec<f32>) -> Self {
        Self(vec)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_exposes_its_vector() {
        let embedding = Embedding::new(vec![0.5, 1.5]);
        assert_eq!(embedding.as_slice(), &[0.5, 1.5]);
        assert_eq!(embedding.into_inner(), vec![0.5, 1.5]);
    }
}
