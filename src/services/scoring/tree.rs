/// A regression tree stored as a flat node arena; node 0 is the root
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        weight: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Regularisation and shape limits for a single tree
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    pub reg_alpha: f64,
    pub reg_lambda: f64,
    pub min_child_weight: f64,
}

/// Second-order statistics of one training row
#[derive(Debug, Clone, Copy)]
pub struct GradientPair {
    pub grad: f64,
    pub hess: f64,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Grows a tree on `rows` by exact greedy split search over `features`
    ///
    /// `data[i]` is the feature row of sample `i` and `gradients[i]` its
    /// gradient pair; only the indices listed in `rows` participate.
    pub fn fit(
        data: &[&[f64]],
        gradients: &[GradientPair],
        rows: &[usize],
        features: &[usize],
        params: &TreeParams,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(data, gradients, rows.to_vec(), features, params, 0);
        tree
    }

    /// Returns the leaf weight reached by `x`
    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { weight } => return *weight,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if x[*feature] < *threshold { *left } else { *right };
                }
            }
        }
    }

    #[cfg(test)]
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, Node::Leaf { .. }))
            .count()
    }

    fn grow(
        &mut self,
        data: &[&[f64]],
        gradients: &[GradientPair],
        rows: Vec<usize>,
        features: &[usize],
        params: &TreeParams,
        depth: usize,
    ) -> usize {
        let (grad_sum, hess_sum) = sums(gradients, &rows);
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            weight: leaf_weight(grad_sum, hess_sum, params),
        });

        if depth >= params.max_depth || rows.len() < 2 {
            return id;
        }

        let Some(best) = best_split(data, gradients, &rows, features, grad_sum, hess_sum, params)
        else {
            return id;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&row| data[row][best.feature] < best.threshold);

        let left = self.grow(data, gradients, left_rows, features, params, depth + 1);
        let right = self.grow(data, gradients, right_rows, features, params, depth + 1);
        self.nodes[id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        id
    }
}

fn sums(gradients: &[GradientPair], rows: &[usize]) -> (f64, f64) {
    rows.iter().fold((0.0, 0.0), |(g, h), &row| {
        (g + gradients[row].grad, h + gradients[row].hess)
    })
}

/// L1 soft-thresholding of a gradient sum
fn threshold_l1(grad_sum: f64, alpha: f64) -> f64 {
    if grad_sum > alpha {
        grad_sum - alpha
    } else if grad_sum < -alpha {
        grad_sum + alpha
    } else {
        0.0
    }
}

fn leaf_weight(grad_sum: f64, hess_sum: f64, params: &TreeParams) -> f64 {
    -threshold_l1(grad_sum, params.reg_alpha) / (hess_sum + params.reg_lambda)
}

fn score(grad_sum: f64, hess_sum: f64, params: &TreeParams) -> f64 {
    let g = threshold_l1(grad_sum, params.reg_alpha);
    g * g / (hess_sum + params.reg_lambda)
}

fn best_split(
    data: &[&[f64]],
    gradients: &[GradientPair],
    rows: &[usize],
    features: &[usize],
    grad_sum: f64,
    hess_sum: f64,
    params: &TreeParams,
) -> Option<SplitCandidate> {
    let parent_score = score(grad_sum, hess_sum, params);
    let mut best: Option<SplitCandidate> = None;
    let mut sorted = rows.to_vec();

    for &feature in features {
        sorted.sort_by(|&a, &b| data[a][feature].total_cmp(&data[b][feature]));

        let mut left_grad = 0.0;
        let mut left_hess = 0.0;

        for window in 0..sorted.len() - 1 {
            let row = sorted[window];
            left_grad += gradients[row].grad;
            left_hess += gradients[row].hess;

            let current = data[row][feature];
            let next = data[sorted[window + 1]][feature];
            if current == next {
                continue;
            }

            let right_grad = grad_sum - left_grad;
            let right_hess = hess_sum - left_hess;
            if left_hess < params.min_child_weight || right_hess < params.min_child_weight {
                continue;
            }

            let gain = 0.5
                * (score(left_grad, left_hess, params) + score(right_grad, right_hess, params)
                    - parent_score);

            // Strict comparison keeps the earliest feature/threshold on ties
            if gain > 0.0 && best.map_or(true, |b| gain > b.gain) {
                // Adjacent floats can round the midpoint down onto `current`
                let midpoint = (current + next) / 2.0;
                let threshold = if midpoint > current { midpoint } else { next };
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    gain,
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(max_depth: usize) -> TreeParams {
        TreeParams {
            max_depth,
            reg_alpha: 0.0,
            reg_lambda: 0.0,
            min_child_weight: 1.0,
        }
    }

    /// Gradients of squared error at prediction 0 for the given targets
    fn gradients_for(targets: &[f64]) -> Vec<GradientPair> {
        targets
            .iter()
            .map(|y| GradientPair { grad: -y, hess: 1.0 })
            .collect()
    }

    #[test]
    fn test_single_split_separates_targets() {
        let rows_data: Vec<Vec<f64>> = vec![vec![1.0], vec![2.0], vec![8.0], vec![9.0]];
        let data: Vec<&[f64]> = rows_data.iter().map(|r| r.as_slice()).collect();
        let gradients = gradients_for(&[0.0, 0.0, 4.0, 4.0]);

        let tree = RegressionTree::fit(&data, &gradients, &[0, 1, 2, 3], &[0], &params(1));

        assert_eq!(tree.leaf_count(), 2);
        assert_eq!(tree.predict(&[1.5]), 0.0);
        assert_eq!(tree.predict(&[8.5]), 4.0);
    }

    #[test]
    fn test_depth_zero_is_a_single_leaf() {
        let rows_data: Vec<Vec<f64>> = vec![vec![1.0], vec![3.0]];
        let data: Vec<&[f64]> = rows_data.iter().map(|r| r.as_slice()).collect();
        let gradients = gradients_for(&[2.0, 4.0]);

        let tree = RegressionTree::fit(&data, &gradients, &[0, 1], &[0], &params(0));

        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.predict(&[100.0]), 3.0);
    }

    #[test]
    fn test_constant_feature_never_splits() {
        let rows_data: Vec<Vec<f64>> = vec![vec![1.0], vec![1.0], vec![1.0]];
        let data: Vec<&[f64]> = rows_data.iter().map(|r| r.as_slice()).collect();
        let gradients = gradients_for(&[0.0, 3.0, 6.0]);

        let tree = RegressionTree::fit(&data, &gradients, &[0, 1, 2], &[0], &params(3));

        assert_eq!(tree.leaf_count(), 1);
    }

    #[test]
    fn test_split_between_adjacent_floats_keeps_both_children() {
        let low = 1.0_f64;
        let high = f64::from_bits(low.to_bits() + 1);
        let rows_data: Vec<Vec<f64>> = vec![vec![low], vec![high]];
        let data: Vec<&[f64]> = rows_data.iter().map(|r| r.as_slice()).collect();
        let gradients = gradients_for(&[0.0, 4.0]);

        let tree = RegressionTree::fit(&data, &gradients, &[0, 1], &[0], &params(1));

        assert_eq!(tree.leaf_count(), 2);
        assert_eq!(tree.predict(&[low]), 0.0);
        assert_eq!(tree.predict(&[high]), 4.0);
    }

    #[test]
    fn test_l1_shrinks_leaf_towards_zero() {
        let tree_params = TreeParams {
            reg_alpha: 1.0,
            reg_lambda: 1.0,
            ..params(0)
        };
        // G = -4, H = 2 -> -(-4 + 1) / (2 + 1) = 1.0
        assert_eq!(leaf_weight(-4.0, 2.0, &tree_params), 1.0);
        assert_eq!(leaf_weight(0.5, 2.0, &tree_params), 0.0);
    }
}
