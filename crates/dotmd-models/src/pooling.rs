//! Shared vector post-processing for the embedding adapter: mean pooling
//! over the attention mask, then L2 normalisation so cosine similarity
//! reduces to a dot product in the vector store.

pub fn mean_pool(token_embeddings: &[Vec<f32>], attention_mask: &[i64]) -> Vec<f32> {
    let dim = token_embeddings.first().map(|v| v.len()).unwrap_or(0);
    let mut pooled = vec![0f32; dim];
    let mut count = 0f32;

    for (embedding, &mask) in token_embeddings.iter().zip(attention_mask.iter()) {
        if mask == 0 {
            continue;
        }
        for (acc, value) in pooled.iter_mut().zip(embedding.iter()) {
            *acc += value;
        }
        count += 1.0;
    }

    if count > 0.0 {
        for value in pooled.iter_mut() {
            *value /= count;
        }
    }
    pooled
}

pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_pool_ignores_masked_tokens() {
        let tokens = vec![vec![1.0, 1.0], vec![3.0, 3.0], vec![99.0, 99.0]];
        let mask = [1, 1, 0];
        let pooled = mean_pool(&tokens, &mask);
        assert_eq!(pooled, vec![2.0, 2.0]);
    }

    #[test]
    fn l2_normalize_produces_unit_vector() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        let norm = (v[0] * v[0] + v[1] * v[1]).sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
